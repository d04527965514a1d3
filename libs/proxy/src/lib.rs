//! Transparent lazy object proxy.
//!
//! A [`Proxy<F>`] is a by-value handle that behaves indistinguishably from
//! the object its [`ProxyFactory`] returns, for every operation `Deref`
//! exposes, and lazily, at-most-once materializes that object on first use.
//!
//! Rust has no magic-method dispatch protocol, so full operator transparency
//! (the Python original's `lazy_object_proxy`-style forwarding of arithmetic,
//! iteration, calling, etc.) is not portable. Instead this crate follows the
//! re-architecture guidance: the proxy is statically typed over its target
//! `F::Target` and transparency is achieved through `Deref`/`DerefMut`, plus
//! delegating blanket impls for the handful of traits that need one
//! (`Debug`, `Display`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`,
//! `Serialize`, `Deserialize`). The proxy does not report the target's
//! runtime type the way the Python version does for `isinstance` checks;
//! that contract does not exist in a statically typed language.

mod factory;
mod proxy;

pub use factory::ProxyFactory;
pub use proxy::{Proxy, ProxyHints};
