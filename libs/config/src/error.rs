//! Configuration-boundary errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid name '{0}': must match [A-Za-z0-9_-]+")]
    InvalidName(String),

    #[error("invalid uuid '{0}': {1}")]
    InvalidUuid(String, uuid::Error),

    #[error("port {0} is out of range 1..=65535")]
    InvalidPort(u32),

    #[error("relay address '{0}' must use the ws:// or wss:// scheme")]
    InvalidRelayAddress(String),

    #[error("peer_channels must be >= 1, got {0}")]
    InvalidPeerChannels(u32),

    #[error("max_object_size must be >= 1, got {0}")]
    InvalidMaxObjectSize(u64),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config_crate::ConfigError),

    #[error("failed to read or write persisted state at {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to (de)serialize TOML: {0}")]
    Toml(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
