use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ModelError, Result};
use crate::torch::constants::{CHECKPOINT_DIR, CHECKPOINT_NAME, META_EXTENSION, WEIGHTS_EXTENSION};
use crate::torch::model::{ModelConfig, PairsTradingModel};

/// Written next to the weights so a restore can refuse mismatched layouts
/// before libtorch sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub config: ModelConfig,
    pub saved_at: DateTime<Utc>,
}

pub fn weights_path<P: AsRef<Path>>(dir: P) -> PathBuf {
    dir.as_ref()
        .join(format!("{CHECKPOINT_NAME}.{WEIGHTS_EXTENSION}"))
}

pub fn meta_path<P: AsRef<Path>>(dir: P) -> PathBuf {
    dir.as_ref()
        .join(format!("{CHECKPOINT_NAME}.{META_EXTENSION}"))
}

pub fn read_meta<P: AsRef<Path>>(dir: P) -> Result<CheckpointMeta> {
    let path = meta_path(dir);
    if !path.is_file() {
        return Err(ModelError::MissingCheckpoint(path));
    }
    let bytes = fs::read(&path)?;
    Ok(postcard::from_bytes(&bytes)?)
}

impl PairsTradingModel {
    /// Saves all trainable parameters into `dir`, creating it if needed.
    /// Returns the weights file path.
    pub fn save_model<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let weights = weights_path(dir);
        self.vs.save(&weights)?;

        let meta = CheckpointMeta {
            config: self.config.clone(),
            saved_at: Utc::now(),
        };
        fs::write(meta_path(dir), postcard::to_stdvec(&meta)?)?;

        info!(path = %weights.display(), "saved checkpoint");
        Ok(weights)
    }

    /// Restores parameters written by [`PairsTradingModel::save_model`]. The
    /// model must have the same layer widths and counts as the saved one.
    pub fn load_model<P: AsRef<Path>>(&mut self, dir: P) -> Result<CheckpointMeta> {
        let dir = dir.as_ref();
        let meta = read_meta(dir)?;
        if !self.config.same_architecture(&meta.config) {
            return Err(ModelError::IncompatibleCheckpoint {
                expected: self.config.architecture(),
                found: meta.config.architecture(),
            });
        }

        let weights = weights_path(dir);
        if !weights.is_file() {
            return Err(ModelError::MissingCheckpoint(weights));
        }
        self.vs.load(&weights)?;

        info!(
            path = %weights.display(),
            saved_at = %meta.saved_at,
            "restored checkpoint"
        );
        Ok(meta)
    }

    /// [`PairsTradingModel::save_model`] into [`CHECKPOINT_DIR`], relative to
    /// the working directory.
    pub fn save_default(&self) -> Result<PathBuf> {
        self.save_model(CHECKPOINT_DIR)
    }

    pub fn load_default(&mut self) -> Result<CheckpointMeta> {
        self.load_model(CHECKPOINT_DIR)
    }
}
