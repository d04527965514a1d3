//! Wire types shared between the endpoint daemon and the relay server.
//!
//! Two independent protocols live here:
//!   - [`relay`]: the JSON messages exchanged over the relay's WebSocket
//!     (spec §4.7) — registration, forwarded peer session descriptions,
//!     and the relay's own responses.
//!   - [`peer`]: the request/response framing used over a single WebRTC
//!     data channel between two endpoints (spec §4.6's "Ordering and
//!     message framing"): a request id ties a response to its request,
//!     and large payloads are chunked with a length prefix.
//!
//! Neither protocol depends on the other; an endpoint process links both,
//! a relay process only `relay`.

pub mod error;
pub mod peer;
pub mod relay;

pub use error::{NetworkError, NetworkResult};
