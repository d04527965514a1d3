//! `Consumer`: decodes [`Event`]s off a [`Subscriber`] and yields a Proxy
//! for each, built via `Store::proxy_from_key` (spec §4.8).

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use proxystore_proxy::Proxy;
use proxystore_store::{Store, StoreFactory};
use serde::de::DeserializeOwned;

use crate::error::StreamResult;
use crate::event::Event;
use crate::transport::Subscriber;

pub struct Consumer<S: Subscriber, T> {
    store: Arc<Store>,
    subscriber: S,
    _marker: PhantomData<fn() -> T>,
}

impl<S, T> Consumer<S, T>
where
    S: Subscriber,
    T: DeserializeOwned + Clone + Send + Sync + Debug + 'static,
{
    pub fn new(store: Arc<Store>, subscriber: S) -> Self {
        Self {
            store,
            subscriber,
            _marker: PhantomData,
        }
    }

    /// Blocks for the next event; `Ok(None)` means the topic closed.
    pub fn recv(&self) -> StreamResult<Option<Proxy<StoreFactory<T>>>> {
        let Some(bytes) = self.subscriber.recv()? else {
            return Ok(None);
        };
        let event: Event = serde_json::from_slice(&bytes)?;
        Ok(Some(self.store.proxy_from_key(event.key, event.evict)))
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn close(&self, close_transport: bool) -> StreamResult<()> {
        self.store.close()?;
        if close_transport {
            self.subscriber.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::Producer;
    use crate::transport::InMemoryBroker;
    use proxystore_codec::CodecKind;
    use proxystore_connectors::local::LocalConnector;

    fn store(name: &str) -> Arc<Store> {
        Arc::new(Store::new(name.to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 16, false, false).unwrap())
    }

    #[test]
    fn consumer_yields_a_proxy_that_resolves_to_the_sent_object() {
        let broker = InMemoryBroker::new();
        let shared_store = store("consumer-test");

        let producer = Producer::new(shared_store.clone(), broker.publisher("topic"), false);
        let consumer: Consumer<_, String> = Consumer::new(shared_store, broker.subscriber("topic"));

        producer.send(&"hello".to_string(), None).unwrap();

        let proxy = consumer.recv().unwrap().unwrap();
        assert!(!proxy.is_resolved());
        assert_eq!(*proxy, "hello".to_string());
    }
}
