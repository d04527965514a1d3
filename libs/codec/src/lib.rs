//! Object <-> byte serialization for ProxyStore.
//!
//! A Connector only ever sees bytes (spec §3: "The Connector is oblivious
//! to object semantics"); this crate is the layer above it that turns
//! objects into the bytes a Connector persists, and back. The default
//! strategy (bincode) produces self-describing bytes suitable for
//! round-trip; callers may opt into a named alternative per `StoreConfig`.

pub mod error;
pub mod registry;

pub use error::{CodecError, CodecResult};
pub use registry::{CodecKind, Deserializer};
