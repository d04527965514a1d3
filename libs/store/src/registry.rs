//! Process-wide Store registry (spec §4.3, §9 "Global mutable state").
//!
//! A genuine singleton with `init`/`get`/`register`/`unregister`/`clear`
//! lifecycle, guarded by a single lock across insert/lookup. This is how a
//! [`crate::factory::StoreFactory`] avoids reconstructing its Store on
//! every resolve: the first resolve in a process builds and inserts it,
//! subsequent resolves (in this process or any proxy sharing this Store's
//! name) reuse the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::StoreResult;
use crate::store::Store;

static REGISTRY: Lazy<Mutex<HashMap<String, Arc<Store>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Insert `store` under its own name, replacing any previous registration
/// for that name. Returns the store that was displaced, if any.
pub fn register_store(store: Arc<Store>) -> Option<Arc<Store>> {
    REGISTRY.lock().insert(store.name().to_string(), store)
}

pub fn unregister_store(name: &str) -> Option<Arc<Store>> {
    REGISTRY.lock().remove(name)
}

pub fn get_store(name: &str) -> Option<Arc<Store>> {
    REGISTRY.lock().get(name).cloned()
}

/// Clear every registration. Intended for test isolation between cases
/// that each build their own store of the same name.
pub fn clear() {
    REGISTRY.lock().clear()
}

/// Look up `name`; if absent, build it with `init` and insert it, all
/// under the same lock so two concurrent resolvers can't both construct
/// and race to register distinct instances.
pub fn get_or_init<F>(name: &str, init: F) -> StoreResult<Arc<Store>>
where
    F: FnOnce() -> StoreResult<Store>,
{
    let mut guard = REGISTRY.lock();
    if let Some(store) = guard.get(name) {
        return Ok(store.clone());
    }
    let store = Arc::new(init()?);
    guard.insert(name.to_string(), store.clone());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxystore_codec::CodecKind;
    use proxystore_connectors::local::LocalConnector;

    fn store(name: &str) -> Store {
        Store::new(name.to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 16, false, false).unwrap()
    }

    #[test]
    fn register_then_get_returns_the_same_instance() {
        clear();
        let s = Arc::new(store("registry-test-a"));
        register_store(s.clone());
        let fetched = get_store("registry-test-a").unwrap();
        assert!(Arc::ptr_eq(&s, &fetched));
        unregister_store("registry-test-a");
    }

    #[test]
    fn get_or_init_only_constructs_once() {
        clear();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let build = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(store("registry-test-b"))
        };
        let first = get_or_init("registry-test-b", build).unwrap();
        let second = get_or_init("registry-test-b", || unreachable!("must not rebuild")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        unregister_store("registry-test-b");
    }

    #[test]
    fn unregister_removes_the_entry() {
        clear();
        register_store(Arc::new(store("registry-test-c")));
        assert!(unregister_store("registry-test-c").is_some());
        assert!(get_store("registry-test-c").is_none());
    }
}
