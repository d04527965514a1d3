//! Errors produced by the Store facade, its factories, and the process
//! registry (spec §7).

use proxystore_codec::CodecError;
use proxystore_connectors::{ConnectorError, Key};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache_size must be >= 0, got {0}")]
    InvalidCacheSize(i64),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("cannot proxy a value of non-proxiable type `{type_name}`; pass skip_nonproxiable to return it unwrapped instead")]
    NonProxiable { type_name: &'static str },

    #[error("store '{0}' is not registered in this process")]
    NotRegistered(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while resolving a [`crate::factory::StoreFactory`] or
/// [`crate::factory::PollingStoreFactory`] (spec §4.1 "Failure semantics").
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("key {key:?} is missing from connector '{connector}' of store '{store}'")]
    MissingKey {
        key: Key,
        connector: &'static str,
        store: String,
    },

    #[error("store '{store}' is not registered and its embedded config could not reconstruct it: {reason}")]
    StoreUnavailable { store: String, reason: String },

    #[error("polling resolve for key {key:?} in store '{store}' exceeded its timeout")]
    PollingTimeout { key: Key, store: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type FactoryResult<T> = Result<T, FactoryError>;
