//! Factories that back a [`Proxy`]: [`StoreFactory`] resolves a key that is
//! already expected to exist, [`PollingStoreFactory`] polls for a key that
//! may not exist yet, and [`ProxyFuture`] is the producer-side handle for
//! the polling case (spec §4.1, §4.4).

use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use proxystore_connectors::Key;
use proxystore_proxy::{Proxy, ProxyFactory};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::{FactoryError, FactoryResult};
use crate::registry;
use crate::store::Store;

/// Look up this process's registered Store by name, reconstructing it from
/// `config` on first use (spec §4.3: a deserialized factory in a fresh
/// process has no live Store yet, only the record to rebuild one).
fn resolve_store(name: &str, config: &StoreConfig) -> FactoryResult<std::sync::Arc<Store>> {
    registry::get_or_init(name, || Store::from_config(config)).map_err(|e| FactoryError::StoreUnavailable {
        store: name.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves a key expected to already be present. The common case: the
/// producer called `Store::proxy` and the object is already stored by the
/// time any consumer deserializes the proxy.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StoreFactory<T> {
    store_name: String,
    store_config: StoreConfig,
    key: Key,
    evict: bool,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> StoreFactory<T> {
    pub fn new(store_name: String, store_config: StoreConfig, key: Key, evict: bool) -> Self {
        Self {
            store_name,
            store_config,
            key,
            evict,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl<T> fmt::Debug for StoreFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreFactory")
            .field("store_name", &self.store_name)
            .field("key", &self.key)
            .field("evict", &self.evict)
            .finish()
    }
}

impl<T> ProxyFactory for StoreFactory<T>
where
    T: DeserializeOwned + Clone + Send + Sync + fmt::Debug + 'static,
{
    type Target = T;
    type Error = FactoryError;

    fn resolve(&self) -> Result<Self::Target, Self::Error> {
        let store = resolve_store(&self.store_name, &self.store_config)?;
        let value = store.get::<T>(&self.key)?.ok_or_else(|| FactoryError::MissingKey {
            key: self.key.clone(),
            connector: store.connector_kind(),
            store: self.store_name.clone(),
        })?;
        if self.evict {
            store.evict(&self.key)?;
        }
        Ok(value)
    }
}

/// Resolves a key that may not exist yet, polling the connector until it
/// appears or `polling_timeout_ms` elapses (spec §4.4). A `None` timeout
/// polls forever.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PollingStoreFactory<T> {
    store_name: String,
    store_config: StoreConfig,
    key: Key,
    evict: bool,
    polling_interval_ms: u64,
    polling_timeout_ms: Option<u64>,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> PollingStoreFactory<T> {
    pub fn new(
        store_name: String,
        store_config: StoreConfig,
        key: Key,
        evict: bool,
        polling_interval_ms: u64,
        polling_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            store_name,
            store_config,
            key,
            evict,
            polling_interval_ms,
            polling_timeout_ms,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PollingStoreFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingStoreFactory")
            .field("store_name", &self.store_name)
            .field("key", &self.key)
            .field("evict", &self.evict)
            .field("polling_interval_ms", &self.polling_interval_ms)
            .field("polling_timeout_ms", &self.polling_timeout_ms)
            .finish()
    }
}

impl<T> ProxyFactory for PollingStoreFactory<T>
where
    T: DeserializeOwned + Clone + Send + Sync + fmt::Debug + 'static,
{
    type Target = T;
    type Error = FactoryError;

    fn resolve(&self) -> Result<Self::Target, Self::Error> {
        let store = resolve_store(&self.store_name, &self.store_config)?;
        let interval = Duration::from_millis(self.polling_interval_ms.max(1));
        let deadline = self.polling_timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));

        loop {
            if let Some(value) = store.get::<T>(&self.key)? {
                if self.evict {
                    store.evict(&self.key)?;
                }
                return Ok(value);
            }
            // Spec §4.4: "the Polling factory stops with missing-key when
            // its own timeout elapses" - same variant as the non-polling
            // case, distinguished only by the fact that time passed.
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(FactoryError::MissingKey {
                        key: self.key.clone(),
                        connector: store.connector_kind(),
                        store: self.store_name.clone(),
                    });
                }
            }
            std::thread::sleep(interval);
        }
    }
}

/// Producer-side handle for a key allocated via `Store::future` before the
/// object backing it exists (spec §4.4). `set_result` fulfils it; `proxy`
/// hands the consumer side a [`Proxy`] over a [`PollingStoreFactory`].
pub struct ProxyFuture<T> {
    store_name: String,
    store_config: StoreConfig,
    key: Key,
    polling_interval_ms: u64,
    polling_timeout_ms: Option<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProxyFuture<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + fmt::Debug + 'static,
{
    pub fn new(
        store_name: String,
        store_config: StoreConfig,
        key: Key,
        polling_interval_ms: u64,
        polling_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            store_name,
            store_config,
            key,
            polling_interval_ms,
            polling_timeout_ms,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Fulfil the key this future was allocated with, unblocking any
    /// consumer currently polling a proxy built from [`Self::proxy`].
    pub fn set_result(&self, obj: &T) -> FactoryResult<()> {
        let store = resolve_store(&self.store_name, &self.store_config)?;
        store.fulfill(&self.key, obj)?;
        Ok(())
    }

    /// Build the consumer-facing proxy, which polls until `set_result` is
    /// called (possibly in another process).
    pub fn proxy(&self) -> Proxy<PollingStoreFactory<T>> {
        Proxy::new(PollingStoreFactory::new(
            self.store_name.clone(),
            self.store_config.clone(),
            self.key.clone(),
            false,
            self.polling_interval_ms,
            self.polling_timeout_ms,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxystore_codec::CodecKind;
    use proxystore_connectors::local::LocalConnector;
    use std::time::Duration;

    fn fresh_store(name: &str) -> std::sync::Arc<Store> {
        registry::unregister_store(name);
        let store = Store::new(name.to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 16, false, false).unwrap();
        let store = std::sync::Arc::new(store);
        registry::register_store(store.clone());
        store
    }

    #[test]
    fn store_factory_resolves_an_existing_key() {
        let store = fresh_store("factory-test-a");
        let key = store.put(&vec![1, 2, 3]).unwrap();
        let factory = StoreFactory::<Vec<i32>>::new("factory-test-a".to_string(), store.config(), key, false);
        assert_eq!(factory.resolve().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn store_factory_reports_missing_key() {
        let store = fresh_store("factory-test-b");
        let key = store.put(&1u32).unwrap();
        store.evict(&key).unwrap();
        let factory = StoreFactory::<u32>::new("factory-test-b".to_string(), store.config(), key, false);
        let err = factory.resolve().unwrap_err();
        assert!(matches!(err, FactoryError::MissingKey { .. }));
    }

    #[test]
    fn store_factory_evicts_after_resolve_when_requested() {
        let store = fresh_store("factory-test-c");
        let key = store.put(&"x".to_string()).unwrap();
        let factory = StoreFactory::<String>::new("factory-test-c".to_string(), store.config(), key.clone(), true);
        assert_eq!(factory.resolve().unwrap(), "x".to_string());
        assert!(!store.exists(&key).unwrap());
    }

    #[test]
    fn proxy_future_unblocks_a_polling_consumer() {
        let store = fresh_store("factory-test-d");
        let future = store
            .future::<String>(Duration::from_millis(5), Some(Duration::from_secs(2)))
            .unwrap();
        let consumer = future.proxy();
        assert!(!consumer.is_resolved());

        future.set_result(&"done".to_string()).unwrap();
        assert_eq!(*consumer, "done".to_string());
    }

    #[test]
    fn polling_factory_times_out_as_missing_key() {
        let store = fresh_store("factory-test-e");
        let key = store.put(&"gone".to_string()).unwrap();
        store.evict(&key).unwrap();
        let factory = PollingStoreFactory::<String>::new(
            "factory-test-e".to_string(),
            store.config(),
            key,
            false,
            5,
            Some(20),
        );
        let err = factory.resolve().unwrap_err();
        assert!(matches!(err, FactoryError::MissingKey { .. }));
    }
}
