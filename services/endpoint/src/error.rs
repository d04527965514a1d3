//! Endpoint-daemon errors (spec §7: bad request, transient peer error,
//! and the storage-ceiling rejection that the HTTP layer turns into a
//! 413-equivalent response).

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Config(#[from] proxystore_config::ConfigError),

    #[error(transparent)]
    Network(#[from] proxystore_network::NetworkError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object of {size} bytes exceeds the configured maximum of {max} bytes")]
    ObjectTooLarge { size: u64, max: u64 },

    #[error("storage io error: {0}")]
    Storage(String),

    #[error("peer {0} is not a known peer of this endpoint")]
    UnknownPeer(Uuid),

    #[error("peer channel to {peer} closed mid-request; safe to retry")]
    TransientPeer { peer: Uuid },

    #[error("peer {peer} did not answer the connection offer before the request deadline")]
    PeerTimeout { peer: Uuid },

    #[error("webrtc error: {0}")]
    WebRtc(String),
}

pub type EndpointResult<T> = Result<T, EndpointError>;
