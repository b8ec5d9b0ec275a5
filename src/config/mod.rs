use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::file::DEFAULT_POOL_CAPACITY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid buffer pool capacity: {0}")]
    InvalidCapacity(usize),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for opening a database and sizing its buffer pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Directory holding the page files
    pub data_dir: PathBuf,
    /// Number of page slots in the buffer pool
    pub capacity: usize,
    /// Sync a file to disk after every write-back
    pub sync_on_flush: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            capacity: DEFAULT_POOL_CAPACITY,
            sync_on_flush: false,
        }
    }
}

impl PoolConfig {
    /// Read a JSON config file. Missing fields take their default values.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}
