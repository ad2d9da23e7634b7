use ndarray::{ArrayView1, ArrayView2};
use tch::{Kind, Tensor};

use crate::error::{ModelError, Result};
use crate::torch::model::{HiddenState, PairsTradingModel, PreviousOutput};

/// One fully populated model input: features, realized returns, fee, dropout
/// keep probability and the recurrent carry from the previous call.
#[derive(Debug)]
pub struct FeedBatch {
    /// `[T, feature_number]`
    pub(crate) features: Tensor,
    /// `[T, 1]` gross returns realized after acting at each step
    pub(crate) returns: Tensor,
    pub(crate) fee: f64,
    pub(crate) keep_prob: f64,
    pub(crate) hidden_state: HiddenState,
    pub(crate) previous_output: PreviousOutput,
}

impl FeedBatch {
    pub fn steps(&self) -> i64 {
        self.features.size()[0]
    }

    pub fn fee(&self) -> f64 {
        self.fee
    }

    pub fn keep_prob(&self) -> f64 {
        self.keep_prob
    }

    pub fn set_keep_prob(&mut self, keep_prob: f64) -> Result<()> {
        check_keep_prob(keep_prob)?;
        self.keep_prob = keep_prob;
        Ok(())
    }
}

fn check_keep_prob(keep_prob: f64) -> Result<()> {
    if keep_prob > 0.0 && keep_prob <= 1.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidKeepProb(keep_prob))
    }
}

impl PairsTradingModel {
    /// Validates every input against the model's declared shapes and moves
    /// them onto the model device.
    pub fn build_feed_dict(
        &self,
        features: ArrayView2<'_, f32>,
        returns: ArrayView1<'_, f32>,
        keep_prob: f64,
        fee: f64,
        hidden_state: &HiddenState,
        previous_output: &PreviousOutput,
    ) -> Result<FeedBatch> {
        let (steps, columns) = features.dim();
        if steps == 0 {
            return Err(ModelError::EmptyBatch);
        }
        let steps = steps as i64;

        let feature_number = self.config.feature_number;
        if columns as i64 != feature_number {
            return Err(ModelError::ShapeMismatch {
                what: "features",
                expected: vec![steps, feature_number],
                actual: vec![steps, columns as i64],
            });
        }
        if returns.len() as i64 != steps {
            return Err(ModelError::ShapeMismatch {
                what: "returns",
                expected: vec![steps],
                actual: vec![returns.len() as i64],
            });
        }
        check_keep_prob(keep_prob)?;

        let layers = self.config.rnn_hidden_layer_number;
        let units = self.config.rnn_hidden_units_number;
        let hidden_shape = hidden_state.size();
        if hidden_shape != [layers, 1, units] {
            return Err(ModelError::ShapeMismatch {
                what: "hidden_state",
                expected: vec![layers, 1, units],
                actual: hidden_shape,
            });
        }
        let output_shape = previous_output.size();
        if output_shape != [1, units] {
            return Err(ModelError::ShapeMismatch {
                what: "previous_output",
                expected: vec![1, units],
                actual: output_shape,
            });
        }

        let feature_values: Vec<f32> = features.iter().copied().collect();
        let return_values: Vec<f32> = returns.iter().copied().collect();

        Ok(FeedBatch {
            features: Tensor::from_slice(&feature_values)
                .view([steps, feature_number])
                .to_device(self.device),
            returns: Tensor::from_slice(&return_values)
                .view([steps, 1])
                .to_device(self.device),
            fee,
            keep_prob,
            hidden_state: HiddenState(
                hidden_state.0.to_kind(Kind::Float).to_device(self.device),
            ),
            previous_output: PreviousOutput(
                previous_output.0.to_kind(Kind::Float).to_device(self.device),
            ),
        })
    }

    /// Forwards to [`FeedBatch::set_keep_prob`], e.g. 1.0 before trading on a
    /// batch that was used for training.
    pub fn change_drop_keep_prob(&self, mut batch: FeedBatch, new_prob: f64) -> Result<FeedBatch> {
        batch.set_keep_prob(new_prob)?;
        Ok(batch)
    }
}
