//! Thin producer/consumer layer over a [`proxystore_store::Store`] and a
//! pub/sub transport (spec §4.8): `send` puts an object and publishes a
//! reference to it; the consuming side decodes that reference into a lazy
//! proxy without the Store ever seeing the pub/sub message itself.

pub mod consumer;
pub mod error;
pub mod event;
pub mod producer;
pub mod transport;

pub use consumer::Consumer;
pub use error::{StreamError, StreamResult};
pub use event::Event;
pub use producer::Producer;
pub use transport::{InMemoryBroker, InMemoryPublisher, InMemorySubscriber, Publisher, Subscriber};
