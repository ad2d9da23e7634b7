mod encoder;
mod head;
mod inference;
mod recurrent;
mod train;

use serde::{Deserialize, Serialize};
use tch::nn::Init;
use tch::{nn, nn::OptimizerConfig, Device, Kind, Tensor};
use tracing::info;

use crate::error::{ModelError, Result};
use crate::torch::constants::{
    DENSE_UNITS, DOWNSIDE_TARGET, LEARNING_RATE, RNN_HIDDEN_LAYERS, RNN_HIDDEN_UNITS,
};

pub use crate::torch::reward::Objective;
pub use inference::TradeOutput;

use encoder::FeatureEncoder;
use head::ActionHead;
use recurrent::RecurrentStack;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub feature_number: i64,
    pub object_function: Objective,
    pub dense_units_list: Vec<i64>,
    pub rnn_hidden_layer_number: i64,
    pub rnn_hidden_units_number: i64,
    pub learning_rate: f64,
    /// Sortino target, also subtracted from rewards before the Sharpe moments
    pub downside_target: f64,
    /// Global gradient norm cap; `None` applies raw Adam steps
    pub max_grad_norm: Option<f64>,
}

impl ModelConfig {
    pub fn new(feature_number: i64) -> Self {
        Self {
            feature_number,
            object_function: Objective::default(),
            dense_units_list: DENSE_UNITS.to_vec(),
            rnn_hidden_layer_number: RNN_HIDDEN_LAYERS,
            rnn_hidden_units_number: RNN_HIDDEN_UNITS,
            learning_rate: LEARNING_RATE,
            downside_target: DOWNSIDE_TARGET,
            max_grad_norm: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_number <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "feature_number must be positive, got {}",
                self.feature_number
            )));
        }
        if let Some(units) = self.dense_units_list.iter().find(|&&u| u <= 0) {
            return Err(ModelError::InvalidConfig(format!(
                "dense layer widths must be positive, got {units}"
            )));
        }
        if self.rnn_hidden_layer_number <= 0 || self.rnn_hidden_units_number <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "recurrent stack must have positive depth and width, got {}x{}",
                self.rnn_hidden_layer_number, self.rnn_hidden_units_number
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm.is_finite() && norm > 0.0) {
                return Err(ModelError::InvalidConfig(format!(
                    "max_grad_norm must be positive, got {norm}"
                )));
            }
        }
        Ok(())
    }

    /// True when both configs produce identically shaped parameter sets.
    pub fn same_architecture(&self, other: &ModelConfig) -> bool {
        self.feature_number == other.feature_number
            && self.dense_units_list == other.dense_units_list
            && self.rnn_hidden_layer_number == other.rnn_hidden_layer_number
            && self.rnn_hidden_units_number == other.rnn_hidden_units_number
    }

    pub fn architecture(&self) -> String {
        format!(
            "features={} dense={:?} rnn={}x{}",
            self.feature_number,
            self.dense_units_list,
            self.rnn_hidden_layer_number,
            self.rnn_hidden_units_number
        )
    }
}

/// Per-layer GRU hidden vectors, shaped `[layers, 1, units]`.
///
/// Owned by the caller between calls. Start every episode from
/// [`PairsTradingModel::get_rnn_zero_state`] and afterwards pass back the state
/// returned by the previous [`PairsTradingModel::trade`].
#[derive(Debug)]
pub struct HiddenState(pub(crate) Tensor);

impl HiddenState {
    pub fn from_tensor(tensor: Tensor) -> Self {
        Self(tensor)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }

    pub fn size(&self) -> Vec<i64> {
        self.0.size()
    }

    pub fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(Vec::<f32>::try_from(self.0.flatten(0, -1))?)
    }
}

impl Clone for HiddenState {
    fn clone(&self) -> Self {
        Self(self.0.copy())
    }
}

/// Last recurrent output of the previous call, shaped `[1, units]`. The action
/// head turns it into the position held going into the next batch.
#[derive(Debug)]
pub struct PreviousOutput(pub(crate) Tensor);

impl PreviousOutput {
    pub fn from_tensor(tensor: Tensor) -> Self {
        Self(tensor)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }

    pub fn size(&self) -> Vec<i64> {
        self.0.size()
    }

    pub fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(Vec::<f32>::try_from(self.0.flatten(0, -1))?)
    }
}

impl Clone for PreviousOutput {
    fn clone(&self) -> Self {
        Self(self.0.copy())
    }
}

fn xavier_std(fan_in: i64, fan_out: i64) -> f64 {
    (2.0 / (fan_in + fan_out) as f64).sqrt()
}

pub(super) fn xavier_normal_init(fan_in: i64, fan_out: i64) -> Init {
    Init::Randn {
        mean: 0.0,
        stdev: xavier_std(fan_in, fan_out),
    }
}

pub(super) fn dense_config(fan_in: i64, fan_out: i64) -> nn::LinearConfig {
    nn::LinearConfig {
        ws_init: xavier_normal_init(fan_in, fan_out),
        bs_init: Some(Init::Const(0.0)),
        bias: true,
    }
}

/// Encoder -> stacked GRU -> tanh action head, trained on the negated objective.
///
/// Each instance owns its own `VarStore`, so models never share parameters.
pub struct PairsTradingModel {
    pub(crate) vs: nn::VarStore,
    encoder: FeatureEncoder,
    recurrent: RecurrentStack,
    head: ActionHead,
    optimizer: nn::Optimizer,
    pub(crate) config: ModelConfig,
    pub(crate) device: Device,
}

impl PairsTradingModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        Self::new_on_device(config, Device::cuda_if_available())
    }

    pub fn new_on_device(config: ModelConfig, device: Device) -> Result<Self> {
        config.validate()?;

        let vs = nn::VarStore::new(device);
        let (encoder, recurrent, head) = {
            let root = vs.root();
            let encoder = FeatureEncoder::new(
                &(&root / "encoder"),
                config.feature_number,
                &config.dense_units_list,
                config.rnn_hidden_units_number,
            );
            let recurrent = RecurrentStack::new(
                &(&root / "rnn"),
                config.rnn_hidden_units_number,
                config.rnn_hidden_layer_number,
            );
            let head = ActionHead::new(&(&root / "action"), config.rnn_hidden_units_number);
            (encoder, recurrent, head)
        };

        let model = Self {
            optimizer: nn::Adam::default().build(&vs, config.learning_rate)?,
            vs,
            encoder,
            recurrent,
            head,
            config,
            device,
        };
        model.reset_parameters();

        info!(
            architecture = %model.config.architecture(),
            objective = %model.config.object_function,
            device = ?device,
            "built trading model"
        );
        Ok(model)
    }

    /// Redraws every parameter and discards the optimizer moments.
    pub fn init_model(&mut self) -> Result<()> {
        self.reset_parameters();
        self.optimizer = nn::Adam::default().build(&self.vs, self.config.learning_rate)?;
        info!("re-initialized model parameters");
        Ok(())
    }

    /// Glorot-normal weight matrices, zero bias vectors, except the GRU reset
    /// and update gate biases which start at 1.0.
    fn reset_parameters(&self) {
        let gate_rows = 2 * self.config.rnn_hidden_units_number;
        tch::no_grad(|| {
            for (name, mut var) in self.vs.variables() {
                match var.size().as_slice() {
                    &[fan_out, fan_in] => {
                        let fresh = Tensor::randn([fan_out, fan_in], (var.kind(), var.device()))
                            * xavier_std(fan_in, fan_out);
                        var.copy_(&fresh);
                    }
                    _ => {
                        let _ = var.zero_();
                    }
                }
                // bias_ih rows are laid out [reset, update, candidate]
                if name.contains("bias_ih_l") {
                    let _ = var.narrow(0, 0, gate_rows).fill_(1.0);
                }
            }
        });
    }

    pub fn get_rnn_zero_state(&self) -> HiddenState {
        self.recurrent.zero_state()
    }

    pub fn zero_previous_output(&self) -> PreviousOutput {
        PreviousOutput(Tensor::zeros(
            [1, self.config.rnn_hidden_units_number],
            (Kind::Float, self.device),
        ))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn objective(&self) -> Objective {
        self.config.object_function
    }
}
