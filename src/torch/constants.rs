pub const DENSE_UNITS: [i64; 4] = [1024, 768, 512, 256];
pub const RNN_HIDDEN_LAYERS: i64 = 4;
pub const RNN_HIDDEN_UNITS: i64 = 128;
pub const LEARNING_RATE: f64 = 0.001;

// Sortino target and Sharpe risk-free offset, both applied to per-step log rewards
pub const DOWNSIDE_TARGET: f64 = 0.0;

/// Checkpoint directory used when the caller has no preference
pub const CHECKPOINT_DIR: &str = "./trade_model_checkpoint";
pub const CHECKPOINT_NAME: &str = "trade_model";
pub const WEIGHTS_EXTENSION: &str = "ot";
pub const META_EXTENSION: &str = "meta";
