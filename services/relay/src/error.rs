//! Relay-level errors (spec §7: authentication/authorization, bad request).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] proxystore_config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub type RelayResult<T> = Result<T, RelayError>;
