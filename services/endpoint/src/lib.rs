//! Peer-to-peer endpoint daemon: exposes a local object store over HTTP
//! (spec §4.5) and forwards requests for objects it doesn't hold to their
//! owning endpoint over a direct WebRTC data channel (spec §4.6),
//! discovering and signaling peers through the relay (spec §4.7).

pub mod build;
pub mod error;
pub mod http;
pub mod peer;
pub mod relay_client;
pub mod storage;
pub mod webrtc_channel;

pub use build::build_state;
pub use error::{EndpointError, EndpointResult};
pub use http::{serve, EndpointState};
pub use peer::{PeerFabric, PeerState};
pub use storage::ObjectStore;
