//! Bounded LRU resolve cache, private to each [`crate::Store`] (spec §4.3).
//!
//! The cache is type-erased (`Any`) because one Store may be asked to
//! `get::<T>` with different `T`s over its lifetime (different callers,
//! different proxies); each cached entry still only ever downcasts
//! successfully for the `T` it was inserted under, so a `get::<T>` against
//! a key cached under a different type is treated as a cache miss rather
//! than a panic.

use std::any::Any;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use proxystore_connectors::Key;

type CachedValue = Arc<dyn Any + Send + Sync>;

/// `Cache::new(0)` disables caching entirely: every `get`/`insert` is a
/// no-op and `is_cached` always returns `false`.
pub struct Cache {
    inner: Option<Mutex<LruCache<Key, CachedValue>>>,
}

impl Cache {
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(|n| Mutex::new(LruCache::new(n)));
        Self { inner }
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.is_none()
    }

    /// Look up `key`, returning a clone of the cached value if present and
    /// of type `T`. Touches the LRU order on hit.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &Key) -> Option<T> {
        let inner = self.inner.as_ref()?;
        let mut guard = inner.lock();
        let value = guard.get(key)?;
        value.downcast_ref::<T>().cloned()
    }

    pub fn contains(&self, key: &Key) -> bool {
        match &self.inner {
            None => false,
            Some(inner) => inner.lock().contains(key),
        }
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: Key, value: T) {
        if let Some(inner) = &self.inner {
            inner.lock().put(key, Arc::new(value));
        }
    }

    pub fn remove(&self, key: &Key) {
        if let Some(inner) = &self.inner {
            inner.lock().pop(key);
        }
    }

    pub fn len(&self) -> usize {
        match &self.inner {
            None => 0,
            Some(inner) => inner.lock().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxystore_connectors::LocalKey;

    fn key(n: u64) -> Key {
        Key::Local(LocalKey(n))
    }

    #[test]
    fn never_holds_more_than_capacity_entries() {
        let cache = Cache::new(2);
        cache.insert(key(1), "a".to_string());
        cache.insert(key(2), "b".to_string());
        cache.insert(key(3), "c".to_string());
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn retains_most_recently_accessed_keys() {
        let cache = Cache::new(2);
        cache.insert(key(1), 1u32);
        cache.insert(key(2), 2u32);
        // Touch key 1 so it becomes more recent than key 2.
        assert_eq!(cache.get::<u32>(&key(1)), Some(1));
        cache.insert(key(3), 3u32);
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = Cache::new(0);
        cache.insert(key(1), 1u32);
        assert!(cache.is_disabled());
        assert_eq!(cache.get::<u32>(&key(1)), None);
        assert!(!cache.contains(&key(1)));
    }

    #[test]
    fn mismatched_type_is_a_miss_not_a_panic() {
        let cache = Cache::new(4);
        cache.insert(key(1), 42u32);
        assert_eq!(cache.get::<String>(&key(1)), None);
    }

    #[test]
    fn remove_evicts_immediately() {
        let cache = Cache::new(4);
        cache.insert(key(1), 1u32);
        cache.remove(&key(1));
        assert!(!cache.contains(&key(1)));
    }
}
