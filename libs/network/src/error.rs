//! Errors produced while encoding/decoding the wire protocols in this crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to decode relay message: {0}")]
    RelayDecode(String),

    #[error("failed to encode relay message: {0}")]
    RelayEncode(String),

    #[error("peer frame truncated: expected {expected} bytes, got {got}")]
    FrameTruncated { expected: usize, got: usize },

    #[error("peer frame chunk {chunk} of request {request_id} arrived out of order (expected {expected})")]
    ChunkOutOfOrder {
        request_id: u64,
        chunk: u32,
        expected: u32,
    },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
