use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the trading model. Nothing is recovered internally.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("Batch contains no timesteps")]
    EmptyBatch,

    #[error("Dropout keep probability must be in (0, 1], got {0}")]
    InvalidKeepProb(f64),

    #[error("Unknown objective function: {0}")]
    UnknownObjective(String),

    #[error("Checkpoint not found: {0}")]
    MissingCheckpoint(PathBuf),

    #[error("Checkpoint architecture mismatch: model is {expected}, checkpoint is {found}")]
    IncompatibleCheckpoint { expected: String, found: String },

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint metadata error: {0}")]
    Metadata(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
