//! Byte-level object store backends.
//!
//! A [`Connector`] knows nothing about the objects it stores beyond their
//! raw bytes; everything object-shaped (serialization, proxies, caching)
//! lives one layer up in `proxystore-store`. Six built-in backends are
//! provided: [`local::LocalConnector`] (process-local, in-memory),
//! [`file::FileConnector`] (atomic-write filesystem), [`redis::RedisConnector`],
//! [`globus::GlobusConnector`] (content-addressed cross-filesystem sync),
//! [`endpoint::EndpointConnector`] (HTTP client over a peer daemon), and
//! [`multi::MultiConnector`] (policy-routed fan-out across any of the above).

pub mod connector;
pub mod endpoint;
pub mod error;
pub mod file;
pub mod globus;
pub mod key;
pub mod local;
pub mod multi;
pub mod redis;
pub mod registry;

pub use connector::{Connector, ConnectorConfig};
pub use error::{ConnectorError, ConnectorResult};
pub use key::{EndpointKey, FileKey, GlobusKey, Key, LocalKey, MultiKey, RedisKey};
