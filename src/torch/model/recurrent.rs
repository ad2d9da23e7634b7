use tch::nn::{self, RNN};
use tch::Tensor;

use super::HiddenState;

/// Stacked GRU. Every layer owns its own `weight_ih_l{k}`/`weight_hh_l{k}`
/// parameters; nothing is shared between layers.
pub(super) struct RecurrentStack {
    gru: nn::GRU,
}

impl RecurrentStack {
    pub(super) fn new(p: &nn::Path, units: i64, layers: i64) -> Self {
        let config = nn::RNNConfig {
            num_layers: layers,
            batch_first: true,
            ..Default::default()
        };
        Self {
            gru: nn::gru(p / "gru", units, units, config),
        }
    }

    pub(super) fn zero_state(&self) -> HiddenState {
        HiddenState(self.gru.zero_state(1).0)
    }

    /// Runs the whole `[T, units]` sequence as a single batch starting from
    /// `state`, returning per-step outputs `[T, units]` and the final state.
    pub(super) fn forward(&self, inputs: &Tensor, state: &HiddenState) -> (Tensor, HiddenState) {
        let initial = nn::GRUState(state.0.shallow_clone());
        let (outputs, last) = self.gru.seq_init(&inputs.unsqueeze(0), &initial);
        (outputs.squeeze_dim(0), HiddenState(last.0))
    }
}
