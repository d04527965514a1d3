//! The Store facade: binds a [`proxystore_connectors::Connector`] and a
//! [`proxystore_codec::CodecKind`] behind one object-shaped API, and backs
//! [`proxystore_proxy::Proxy`] with factories that can reconstruct a Store
//! from nothing but its [`config::StoreConfig`] (spec §4.3, §4.1).

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod registry;
pub mod store;

pub use config::StoreConfig;
pub use error::{FactoryError, FactoryResult, StoreError, StoreResult};
pub use factory::{PollingStoreFactory, ProxyFuture, StoreFactory};
pub use metrics::{StoreMetrics, TimerKind, TimerSnapshot};
pub use store::{ProxyOptions, Proxied, Store};
