//! Client configuration.
//!
//! Loads `etherpipe.yaml` files into [`ClientConfig`]. Every field has a
//! default, so an empty document is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Default size of a single socket read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Default cap on a buffered, incomplete reply.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Peer-count thresholds for the externally visible connection quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PeerTiers {
    /// Minimum peer count for "fair".
    pub fair: u64,
    /// Minimum peer count for "good".
    pub good: u64,
}

impl Default for PeerTiers {
    fn default() -> Self {
        Self { fair: 3, good: 8 }
    }
}

/// Settings for the IPC client and its socket driver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Path of the daemon's IPC endpoint.
    pub socket_path: PathBuf,
    /// How long a connect attempt may take before it is treated as failed.
    pub connect_timeout_ms: u64,
    /// Upper bound of a single socket read.
    pub read_chunk_size: usize,
    /// Upper bound of a reply that is still being reassembled.
    pub max_response_bytes: usize,
    /// Connection quality thresholds.
    pub peer_tiers: PeerTiers,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            peer_tiers: PeerTiers::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be positive".into(),
            ));
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "read_chunk_size must be positive".into(),
            ));
        }
        if self.max_response_bytes < self.read_chunk_size {
            return Err(ConfigError::Invalid(
                "max_response_bytes must be at least read_chunk_size".into(),
            ));
        }
        if self.peer_tiers.fair > self.peer_tiers.good {
            return Err(ConfigError::Invalid(format!(
                "peer_tiers.fair ({}) exceeds peer_tiers.good ({})",
                self.peer_tiers.fair, self.peer_tiers.good
            )));
        }
        Ok(())
    }
}

/// Default IPC endpoint of a local geth node.
pub fn default_socket_path() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        home.join(".ethereum").join("geth.ipc")
    } else {
        PathBuf::from("/tmp/geth.ipc")
    }
}
