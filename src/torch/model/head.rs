use tch::{nn, Tensor};

use super::dense_config;

pub(super) struct ActionHead {
    linear: nn::Linear,
}

impl ActionHead {
    pub(super) fn new(p: &nn::Path, units: i64) -> Self {
        Self {
            linear: nn::linear(p / "linear", units, 1, dense_config(units, 1)),
        }
    }

    /// Prepends the carried output to `outputs` (`[T, units]`) and maps each
    /// row to a position in (-1, 1). Row 0 of the `[T + 1, 1]` result is the
    /// position carried into the batch.
    pub(super) fn forward(&self, previous_output: &Tensor, outputs: &Tensor) -> Tensor {
        Tensor::cat(&[previous_output, outputs], 0)
            .apply(&self.linear)
            .tanh()
    }
}
