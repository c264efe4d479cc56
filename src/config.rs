//! Configuration loading.
//!
//! The listen port comes from the command line; everything else lives in
//! an optional TOML file and falls back to serde defaults.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session and frame limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds to (the CLI port is appended).
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
        }
    }
}

/// Capacity and frame-size limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent sessions.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Maximum encoded frame length in bytes, terminator included.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_clients: default_max_clients(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_max_clients() -> usize {
    11
}

fn default_max_frame_len() -> usize {
    relay_proto::DEFAULT_MAX_FRAME_LEN
}
