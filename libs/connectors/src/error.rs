//! Connector-boundary errors.

use thiserror::Error;

use crate::key::Key;

/// Errors a [`crate::Connector`] implementation can raise.
///
/// Matches spec §7's error kinds that originate at the Connector layer:
/// configuration, timeout, dormant (MultiConnector only), and the generic
/// backend-io catch-all. Missing-key is not represented here — a `get` for
/// an absent key returns `Ok(None)`, per the Connector contract; only the
/// Factory layer turns that into a missing-key error.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("configuration error in connector '{connector}': {message}")]
    Configuration {
        connector: &'static str,
        message: String,
    },

    #[error("backend io error in connector '{connector}': {message}")]
    Backend {
        connector: &'static str,
        message: String,
    },

    #[error("operation '{op}' is not supported by connector '{connector}'")]
    Unsupported { connector: &'static str, op: &'static str },

    #[error(
        "multi-connector child '{child}' is dormant on this host (key {key:?}); \
         access is distinct from a missing key"
    )]
    Dormant { child: String, key: Key },

    #[error("no connector policy was suitable for the constraints provided")]
    NoSuitableChild,

    #[error("globus transfer for key {key:?} exceeded its deadline")]
    Timeout { key: Key },

    #[error("unknown connector kind '{0}'")]
    UnknownKind(String),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;
