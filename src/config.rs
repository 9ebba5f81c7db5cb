use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "./assets/db/characters.db";
pub const IN_MEMORY_DB: &str = ":memory:";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_SLUG_ATTEMPTS: u32 = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub db_path: PathBuf,
    pub busy_timeout_ms: u64,
    /// Upper bound on slug claims tried by a single `create` before giving up.
    pub max_slug_attempts: u32,
    pub log_level: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_slug_attempts: DEFAULT_MAX_SLUG_ATTEMPTS,
            log_level: "info".to_string(),
        }
    }
}

impl GraphConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slug_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_slug_attempts must be at least 1".to_string(),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("db_path is empty".to_string()));
        }
        Ok(())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<GraphConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: GraphConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
