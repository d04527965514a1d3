//! `Producer`: puts an object into a Store and publishes an [`Event`]
//! referencing it (spec §4.8).

use std::sync::Arc;

use proxystore_store::Store;
use serde::Serialize;

use crate::error::StreamResult;
use crate::event::Event;
use crate::transport::Publisher;

pub struct Producer<P: Publisher> {
    store: Arc<Store>,
    publisher: P,
    default_evict: bool,
}

impl<P: Publisher> Producer<P> {
    pub fn new(store: Arc<Store>, publisher: P, default_evict: bool) -> Self {
        Self {
            store,
            publisher,
            default_evict,
        }
    }

    /// Puts `obj` into the Store and publishes the resulting key as an
    /// event. `evict` overrides the producer's default for this call.
    pub fn send<T: Serialize>(&self, obj: &T, evict: Option<bool>) -> StreamResult<()> {
        let key = self.store.put(obj)?;
        let event = Event {
            key,
            evict: evict.unwrap_or(self.default_evict),
        };
        let bytes = serde_json::to_vec(&event)?;
        self.publisher.publish(&bytes)?;
        Ok(())
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Closes the Store and, unless `close_transport` is false, the
    /// publisher side too (spec: "unless the caller opts out").
    pub fn close(&self, close_transport: bool) -> StreamResult<()> {
        self.store.close()?;
        if close_transport {
            self.publisher.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryBroker;
    use proxystore_codec::CodecKind;
    use proxystore_connectors::local::LocalConnector;

    fn store() -> Arc<Store> {
        Arc::new(Store::new("producer-test".to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 16, false, false).unwrap())
    }

    #[test]
    fn send_publishes_an_event_referencing_the_put_key() {
        let broker = InMemoryBroker::new();
        let sub = broker.subscriber("events");
        let producer = Producer::new(store(), broker.publisher("events"), false);

        producer.send(&vec![1, 2, 3], None).unwrap();

        let bytes = sub.recv().unwrap().unwrap();
        let event: crate::event::Event = serde_json::from_slice(&bytes).unwrap();
        assert!(!event.evict);

        let value: Vec<i32> = producer.store().get(&event.key).unwrap().unwrap();
        assert_eq!(value, vec![1, 2, 3]);
    }
}
