//! The `ProxyFactory` trait: a serializable closure-over-a-key that resolves
//! to the object a [`crate::Proxy`] stands in for.
//!
//! This crate only depends on the trait, not on any concrete store or
//! connector, so that the proxy stays a reusable smart handle. `proxystore-store`
//! provides the concrete `StoreFactory`/`PollingStoreFactory` implementations.

use std::fmt::Debug;

/// Resolves a [`crate::Proxy`]'s target.
///
/// Implementations must be deterministic: two calls of the same factory
/// (by value) must return objects that compare equal, and a factory must
/// never mutate observable state on a second call (relevant only when the
/// factory does not evict on resolve).
pub trait ProxyFactory: Debug + Send + Sync + 'static {
    /// The type this factory resolves to.
    type Target;
    /// The error returned when resolution fails (e.g. a missing-key error).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolve and return the target object.
    ///
    /// Called at-most-once per [`crate::Proxy`] instance; the proxy caches
    /// the result in its interior-mutable slot.
    fn resolve(&self) -> Result<Self::Target, Self::Error>;
}
