//! Serialization errors for the object codec layer.

use thiserror::Error;

/// Errors produced while moving an object to or from its byte representation.
///
/// These surface as-is to the caller of `Store::put`/`Store::get` per the
/// error propagation policy: the codec layer never retries or recovers.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serializer '{kind}' failed to encode object: {message}")]
    Encode { kind: &'static str, message: String },

    #[error("deserializer '{kind}' refused input ({len} bytes): {message}")]
    Decode {
        kind: &'static str,
        len: usize,
        message: String,
    },

    #[error("unknown codec kind '{0}', expected one of: bincode, json")]
    UnknownKind(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
