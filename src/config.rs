//! Engine configuration, loaded from an optional JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables of the engine. Every field is optional in the file.
///
/// ```
/// use splitsmart_engine::config::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{ "delayer_threshold": 4 }"#).unwrap();
/// assert_eq!(config.delayer_threshold, 4);
/// assert_eq!(config.currency, "INR");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A PENDING obligation reminded more than this many times flags its
    /// debtor as a frequent delayer.
    pub delayer_threshold: u32,
    /// Display currency for amounts.
    pub currency: String,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delayer_threshold: 2,
            currency: "INR".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
