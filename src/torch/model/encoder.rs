use tch::{nn, Tensor};

use super::dense_config;

/// Dense tanh stack with dropout, ending in a projection to the GRU width.
pub(super) struct FeatureEncoder {
    layers: Vec<nn::Linear>,
}

impl FeatureEncoder {
    pub(super) fn new(p: &nn::Path, feature_number: i64, dense_units: &[i64], output_units: i64) -> Self {
        let mut layers = Vec::with_capacity(dense_units.len() + 1);
        let mut in_dim = feature_number;
        for (i, &units) in dense_units.iter().enumerate() {
            layers.push(nn::linear(
                p / format!("dense_{i}"),
                in_dim,
                units,
                dense_config(in_dim, units),
            ));
            in_dim = units;
        }
        layers.push(nn::linear(
            p / "projection",
            in_dim,
            output_units,
            dense_config(in_dim, output_units),
        ));
        Self { layers }
    }

    /// `[T, feature_number]` -> `[T, output_units]`. Dropout is active whenever
    /// `keep_prob < 1`, independent of train/trade mode.
    pub(super) fn forward(&self, features: &Tensor, keep_prob: f64) -> Tensor {
        let drop_prob = 1.0 - keep_prob;
        let dropout = keep_prob < 1.0;
        self.layers
            .iter()
            .fold(features.shallow_clone(), |x, layer| {
                x.apply(layer).tanh().dropout(drop_prob, dropout)
            })
    }
}
