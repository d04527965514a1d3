//! The Store facade (spec §4.3): binds a name, a boxed [`Connector`], a
//! codec, a bounded LRU resolve cache, and optional metrics.

use std::any::TypeId;
use std::time::Duration;

use proxystore_codec::{CodecKind, CodecResult};
use proxystore_connectors::{Connector, ConnectorConfig, Key};
use proxystore_proxy::Proxy;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::Cache;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::factory::{PollingStoreFactory, ProxyFuture, StoreFactory};
use crate::metrics::{StoreMetrics, TimerGuard, TimerKind};

/// Per-call overrides for [`Store::proxy`]/[`Store::proxy_batch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyOptions {
    pub evict: bool,
    pub skip_nonproxiable: bool,
    /// Overrides the Store's `populate_target` default for this call.
    pub populate_target: Option<bool>,
}

/// The outcome of [`Store::proxy`]: either the proxy the caller asked for,
/// or the original object handed back unwrapped because its type is
/// non-proxiable and `skip_nonproxiable` was set.
#[derive(Debug)]
pub enum Proxied<T> {
    Proxy(Proxy<StoreFactory<T>>),
    Passthrough(T),
}

impl<T> Proxied<T> {
    pub fn into_proxy(self) -> Option<Proxy<StoreFactory<T>>> {
        match self {
            Proxied::Proxy(p) => Some(p),
            Proxied::Passthrough(_) => None,
        }
    }
}

pub struct Store {
    name: String,
    connector: Box<dyn Connector>,
    codec: CodecKind,
    cache: Cache,
    cache_size: i64,
    metrics: StoreMetrics,
    populate_target: bool,
    nonproxiable_ints: bool,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("connector", &self.connector.kind_name())
            .field("codec", &self.codec)
            .field("cache_size", &self.cache_size)
            .finish()
    }
}

/// Sentinel types that are never proxied: booleans and unit, plus
/// integers when `nonproxiable_ints` is set (spec §4.3 "non-proxiable
/// sentinel types").
fn type_is_nonproxiable<T: 'static>(nonproxiable_ints: bool) -> bool {
    let id = TypeId::of::<T>();
    if id == TypeId::of::<bool>() || id == TypeId::of::<()>() {
        return true;
    }
    if nonproxiable_ints {
        macro_rules! check_ints {
            ($($t:ty),+ $(,)?) => {
                $( if id == TypeId::of::<$t>() { return true; } )+
            };
        }
        check_ints!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
    }
    false
}

impl Store {
    pub fn new(
        name: String,
        connector: Box<dyn Connector>,
        codec: CodecKind,
        cache_size: i64,
        metrics_enabled: bool,
        populate_target: bool,
    ) -> StoreResult<Self> {
        if cache_size < 0 {
            return Err(StoreError::InvalidCacheSize(cache_size));
        }
        Ok(Self {
            name,
            connector,
            codec,
            cache: Cache::new(cache_size as usize),
            cache_size,
            metrics: StoreMetrics::new(metrics_enabled),
            populate_target,
            nonproxiable_ints: false,
        })
    }

    /// Opt into treating integer types as non-proxiable sentinels too
    /// (spec: "ints if so configured").
    pub fn with_nonproxiable_ints(mut self, enabled: bool) -> Self {
        self.nonproxiable_ints = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    pub fn connector_kind(&self) -> &'static str {
        self.connector.kind_name()
    }

    pub fn connector_config(&self) -> ConnectorConfig {
        self.connector.config()
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            name: self.name.clone(),
            connector: self.connector.config(),
            codec: Some(self.codec),
            cache_size: self.cache_size,
            metrics_enabled: self.metrics.is_enabled(),
            populate_target: self.populate_target,
        }
    }

    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let connector = proxystore_connectors::registry::build_connector(&config.connector)?;
        Self::new(
            config.name.clone(),
            connector,
            config.codec_kind(),
            config.cache_size,
            config.metrics_enabled,
            config.populate_target,
        )
    }

    pub fn put<T: Serialize>(&self, obj: &T) -> StoreResult<Key> {
        let bytes = self.codec.serialize(obj)?;
        let size = bytes.len();
        let key = self.connector.put(&bytes)?;
        self.metrics.record_size(&key, size);
        Ok(key)
    }

    pub fn put_batch<T: Serialize>(&self, objs: &[T]) -> StoreResult<Vec<Key>> {
        let mut encoded = Vec::with_capacity(objs.len());
        for obj in objs {
            encoded.push(self.codec.serialize(obj)?);
        }
        let keys = self.connector.put_batch(&encoded)?;
        for (key, bytes) in keys.iter().zip(encoded.iter()) {
            self.metrics.record_size(key, bytes.len());
        }
        Ok(keys)
    }

    /// Fetch and deserialize with the Store's default codec, using the
    /// cache when possible.
    pub fn get<T>(&self, key: &Key) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let codec = self.codec;
        self.get_with(key, move |bytes| codec.deserialize::<T>(bytes))
    }

    /// Fetch and deserialize with a caller-supplied deserializer, which
    /// overrides the Store's default for this call only.
    pub fn get_with<T, F>(&self, key: &Key, deserializer: F) -> StoreResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&[u8]) -> CodecResult<T>,
    {
        let _total = TimerGuard::start(&self.metrics, TimerKind::Total, key.clone());

        if let Some(value) = self.cache.get::<T>(key) {
            self.metrics.record_cache_hit();
            return Ok(Some(value));
        }
        self.metrics.record_cache_miss();

        let bytes = {
            let _t = TimerGuard::start(&self.metrics, TimerKind::Connector, key.clone());
            self.connector.get(key)?
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        self.metrics.record_size(key, bytes.len());

        let value = {
            let _t = TimerGuard::start(&self.metrics, TimerKind::Deserialize, key.clone());
            deserializer(&bytes)?
        };
        if !self.cache.is_disabled() {
            self.cache.insert(key.clone(), value.clone());
        }
        Ok(Some(value))
    }

    /// Serialize and persist `obj` at a key already allocated via
    /// [`Connector::new_key`] (used by [`ProxyFuture::set_result`]).
    pub fn fulfill<T: Serialize>(&self, key: &Key, obj: &T) -> StoreResult<()> {
        let bytes = self.codec.serialize(obj)?;
        self.connector.set(key, &bytes)?;
        Ok(())
    }

    pub fn exists(&self, key: &Key) -> StoreResult<bool> {
        if self.cache.contains(key) {
            return Ok(true);
        }
        Ok(self.connector.exists(key)?)
    }

    pub fn evict(&self, key: &Key) -> StoreResult<()> {
        self.connector.evict(key)?;
        self.cache.remove(key);
        Ok(())
    }

    pub fn is_cached(&self, key: &Key) -> bool {
        self.cache.contains(key)
    }

    pub fn close(&self) -> StoreResult<()> {
        Ok(self.connector.close()?)
    }

    /// Puts `obj`, then wraps a [`StoreFactory`] bound to this Store's
    /// config in a [`Proxy`] (spec §4.3 `proxy(obj, evict=False, ...)`).
    pub fn proxy<T>(&self, obj: T, opts: ProxyOptions) -> StoreResult<Proxied<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        if type_is_nonproxiable::<T>(self.nonproxiable_ints) {
            if opts.skip_nonproxiable {
                return Ok(Proxied::Passthrough(obj));
            }
            return Err(StoreError::NonProxiable {
                type_name: std::any::type_name::<T>(),
            });
        }

        let key = self.put(&obj)?;
        let factory = StoreFactory::new(self.name.clone(), self.config(), key, opts.evict);
        let populate = opts.populate_target.unwrap_or(self.populate_target);
        let proxy = if populate {
            Proxy::with_target(factory, obj)
        } else {
            Proxy::new(factory)
        };
        Ok(Proxied::Proxy(proxy))
    }

    /// Order-preserving batch variant of [`Store::proxy`]: one Connector
    /// batch call backs every proxy's put.
    pub fn proxy_batch<T>(&self, objs: Vec<T>, opts: ProxyOptions) -> StoreResult<Vec<Proxied<T>>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        if type_is_nonproxiable::<T>(self.nonproxiable_ints) {
            if opts.skip_nonproxiable {
                return Ok(objs.into_iter().map(Proxied::Passthrough).collect());
            }
            return Err(StoreError::NonProxiable {
                type_name: std::any::type_name::<T>(),
            });
        }

        let keys = self.put_batch(&objs)?;
        let populate = opts.populate_target.unwrap_or(self.populate_target);
        let config = self.config();
        Ok(keys
            .into_iter()
            .zip(objs)
            .map(|(key, obj)| {
                let factory = StoreFactory::new(self.name.clone(), config.clone(), key, opts.evict);
                if populate {
                    Proxied::Proxy(Proxy::with_target(factory, obj))
                } else {
                    Proxied::Proxy(Proxy::new(factory))
                }
            })
            .collect())
    }

    /// Build a proxy for a key the caller already knows about, without
    /// putting anything (spec: "trusts caller").
    pub fn proxy_from_key<T>(&self, key: Key, evict: bool) -> Proxy<StoreFactory<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        Proxy::new(StoreFactory::new(self.name.clone(), self.config(), key, evict))
    }

    /// Allocate a key up front via the Connector's deferrable extension,
    /// returning a [`ProxyFuture`] the caller later fulfills with
    /// `set_result` (spec §4.4 "polling resolve").
    pub fn future<T>(
        &self,
        polling_interval: Duration,
        polling_timeout: Option<Duration>,
    ) -> StoreResult<ProxyFuture<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        let key = self.connector.new_key()?;
        Ok(ProxyFuture::new(
            self.name.clone(),
            self.config(),
            key,
            polling_interval.as_millis() as u64,
            polling_timeout.map(|d| d.as_millis() as u64),
        ))
    }
}

/// Construct a polling factory directly, for callers that already hold a
/// key fulfilled out-of-band (mirrors [`Store::proxy_from_key`] but for
/// the polling variant).
pub fn polling_proxy_from_key<T>(
    store_name: String,
    store_config: StoreConfig,
    key: Key,
    evict: bool,
    polling_interval: Duration,
    polling_timeout: Option<Duration>,
) -> Proxy<PollingStoreFactory<T>>
where
    T: DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    Proxy::new(PollingStoreFactory::new(
        store_name,
        store_config,
        key,
        evict,
        polling_interval.as_millis() as u64,
        polling_timeout.map(|d| d.as_millis() as u64),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxystore_connectors::local::LocalConnector;

    fn store() -> Store {
        Store::new("test-store".to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 16, false, false).unwrap()
    }

    #[test]
    fn put_then_get_round_trips() {
        let s = store();
        let key = s.put(&vec![1, 2, 3]).unwrap();
        let value: Vec<i32> = s.get(&key).unwrap().unwrap();
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn get_missing_key_returns_none() {
        let s = store();
        let key = s.put(&1u32).unwrap();
        s.evict(&key).unwrap();
        assert_eq!(s.get::<u32>(&key).unwrap(), None);
        assert!(!s.exists(&key).unwrap());
    }

    #[test]
    fn negative_cache_size_is_rejected() {
        let err = Store::new(
            "bad".to_string(),
            Box::new(LocalConnector::new()),
            CodecKind::Bincode,
            -1,
            false,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCacheSize(-1)));
    }

    #[test]
    fn exists_is_authoritative_on_cache_hit_even_after_backend_eviction() {
        let s = store();
        let key = s.put(&"hello".to_string()).unwrap();
        let _: String = s.get(&key).unwrap().unwrap();
        assert!(s.is_cached(&key));
        assert!(s.exists(&key).unwrap());
    }

    #[test]
    fn cache_tracks_at_most_the_configured_capacity() {
        let s = Store::new(
            "cache-size-test".to_string(),
            Box::new(LocalConnector::new()),
            CodecKind::Bincode,
            1,
            false,
            false,
        )
        .unwrap();
        let k1 = s.put(&"a".to_string()).unwrap();
        let k2 = s.put(&"b".to_string()).unwrap();
        let _: String = s.get(&k1).unwrap().unwrap();
        let _: String = s.get(&k2).unwrap().unwrap();
        assert!(!s.is_cached(&k1));
        assert!(s.is_cached(&k2));
    }

    #[test]
    fn config_round_trips_to_an_equivalent_store() {
        let s = store();
        let key = s.put(&42u32).unwrap();
        let config = s.config();
        let s2 = Store::from_config(&config).unwrap();
        // A fresh LocalConnector reconstructed from config is a distinct
        // in-memory table (spec: Local "never persists across
        // processes"), so config equality is the property under test,
        // not cross-instance data visibility.
        assert_eq!(s2.config(), config);
        let _ = key;
    }

    #[test]
    fn proxy_puts_the_object_and_defers_resolution() {
        let s = store();
        let proxied = s.proxy(vec![1, 2, 3], ProxyOptions::default()).unwrap();
        let p = proxied.into_proxy().unwrap();
        assert!(!p.is_resolved());
        assert_eq!(*p, vec![1, 2, 3]);
        assert!(p.is_resolved());
    }

    #[test]
    fn proxy_rejects_nonproxiable_types_unless_skipped() {
        let s = store();
        let err = s.proxy(true, ProxyOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::NonProxiable { .. }));

        let opts = ProxyOptions {
            skip_nonproxiable: true,
            ..Default::default()
        };
        let proxied = s.proxy(true, opts).unwrap();
        assert!(matches!(proxied, Proxied::Passthrough(true)));
    }

    #[test]
    fn proxy_batch_preserves_order() {
        let s = store();
        let proxied = s
            .proxy_batch(vec![1, 2, 3], ProxyOptions::default())
            .unwrap();
        let values: Vec<i32> = proxied
            .into_iter()
            .map(|p| *p.into_proxy().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
