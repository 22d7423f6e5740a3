//! Configuration management for the image filter server.
//!
//! Handles loading and validating configuration from an optional JSON file.
//! Command line flags and the `PORT` environment variable are layered on top
//! in `main`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Port used when neither the config file nor `PORT` provides one
pub const DEFAULT_PORT: u16 = 8082;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding filtered images while they are being sent
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Upper bound for a single image download, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Largest accepted source image, in bytes
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir().join("image-filter-server")
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_download_bytes() -> u64 {
    20 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            tmp_dir: default_tmp_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ValidationError(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "fetch_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.max_download_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_download_bytes must be greater than 0".to_string(),
            ));
        }

        if self.tmp_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "tmp_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Create the transient directory if it does not exist yet
    pub fn ensure_tmp_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.tmp_dir)?;
        Ok(())
    }
}
