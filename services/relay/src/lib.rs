//! WebSocket relay: authenticates clients, tracks registered peers per
//! user, and forwards WebRTC session-description offers/answers between
//! same-user peers (spec §4.7).

pub mod auth;
pub mod build;
pub mod clients;
pub mod error;
pub mod server;

pub use build::build_state;
pub use error::{RelayError, RelayResult};
pub use server::{serve, RelayState};
