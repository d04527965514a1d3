//! Errors for the stream producer/consumer layer (spec §4.8).

use proxystore_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode stream event: {0}")]
    EventEncode(#[from] serde_json::Error),

    #[error("pub/sub transport error: {0}")]
    Transport(String),

    #[error("topic '{0}' has no subscriber")]
    NoSubscriber(String),
}

pub type StreamResult<T> = Result<T, StreamError>;
