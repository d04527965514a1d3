//! Request/response framing for a single WebRTC data channel between two
//! endpoints (spec §4.6).
//!
//! Every [`PeerRequest`]/[`PeerResponse`] carries a `request_id`; a
//! response's id ties it back to its request, but completion order across
//! in-flight requests is unconstrained (`FIFO per id`, not globally). Frames
//! are written to the channel length-prefixed so a receiver can reassemble
//! a payload that arrived split across multiple channel messages — this is
//! how payloads larger than [`CHUNK_SIZE`] are sent without the data
//! channel itself needing to know about message boundaries.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NetworkError, NetworkResult};

/// Chunk size used when a caller splits a large payload across multiple
/// data-channel sends (spec §4.6: "~16 MB").
pub const CHUNK_SIZE: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX_BYTES: usize = 4;

/// The Connector-shaped operation a request asks the remote endpoint to
/// perform, addressed by object id within the owning endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerOp {
    Get { object_id: Uuid },
    Set { object_id: Uuid, bytes: Vec<u8> },
    Exists { object_id: Uuid },
    Evict { object_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRequest {
    pub request_id: u64,
    pub op: PeerOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerResult {
    Bytes(Option<Vec<u8>>),
    Exists(bool),
    Ack,
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerResponse {
    pub request_id: u64,
    pub result: PeerResult,
}

/// Encode a value as a length-prefixed frame: a 4-byte little-endian
/// length followed by its bincode encoding.
pub fn encode_frame<T: Serialize>(value: &T) -> NetworkResult<Vec<u8>> {
    let body = bincode::serialize(value).map_err(|e| NetworkError::RelayEncode(e.to_string()))?;
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_BYTES + body.len());
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    LittleEndian::write_u32(&mut prefix, body.len() as u32);
    framed.extend_from_slice(&prefix);
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Split a frame's wire bytes into chunks no larger than [`CHUNK_SIZE`] for
/// callers that must bound a single data-channel send.
pub fn chunk(frame: &[u8]) -> impl Iterator<Item = &[u8]> {
    frame.chunks(CHUNK_SIZE)
}

/// Reassembles length-prefixed frames from a byte stream that may deliver
/// them in arbitrarily sized pieces (one per data-channel message).
///
/// One `FrameReassembler` serves one direction of one data channel; it
/// holds only the partially received frame, never more.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buf: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed newly arrived bytes, returning every frame body (length prefix
    /// stripped) that became complete as a result.
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);
        let mut out = Vec::new();
        loop {
            if self.buf.len() < LENGTH_PREFIX_BYTES {
                break;
            }
            let len = LittleEndian::read_u32(&self.buf[..LENGTH_PREFIX_BYTES]) as usize;
            let total = LENGTH_PREFIX_BYTES + len;
            if self.buf.len() < total {
                break;
            }
            let body = self.buf[LENGTH_PREFIX_BYTES..total].to_vec();
            self.buf.drain(..total);
            out.push(body);
        }
        out
    }

    pub fn decode_request(body: &[u8]) -> NetworkResult<PeerRequest> {
        bincode::deserialize(body).map_err(|e| NetworkError::RelayDecode(e.to_string()))
    }

    pub fn decode_response(body: &[u8]) -> NetworkResult<PeerResponse> {
        bincode::deserialize(body).map_err(|e| NetworkError::RelayDecode(e.to_string()))
    }
}
