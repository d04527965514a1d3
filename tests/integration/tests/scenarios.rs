//! Cross-crate end-to-end scenarios from spec §8 ("Concrete end-to-end
//! scenarios (literal values)"). Unit tests inside each crate already cover
//! the properties in isolation; these exercise the same literal scenarios
//! through the public `proxystore-store`/`proxystore-proxy` surface the way
//! an application would actually use them.

use proxystore_codec::CodecKind;
use proxystore_connectors::file::FileConnector;
use proxystore_connectors::local::LocalConnector;
use proxystore_store::{ProxyOptions, Store};

fn local_store(name: &str) -> Store {
    Store::new(name.to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 16, false, false).unwrap()
}

/// S1. Round-trip small list.
#[test]
fn s1_round_trip_small_list() {
    let store = local_store("s1");
    let key = store.put(&vec![1, 2, 3]).unwrap();

    let value: Vec<i32> = store.get(&key).unwrap().unwrap();
    assert_eq!(value, vec![1, 2, 3]);

    store.evict(&key).unwrap();
    assert!(!store.exists(&key).unwrap());
    assert_eq!(store.get::<Vec<i32>>(&key).unwrap(), None);
}

/// S2. Proxy transparency: a forced proxy reads and mutates like its
/// target through `Deref`/`DerefMut`, the idiomatic stand-in for the
/// Python original's full operator forwarding (spec §9).
#[test]
fn s2_proxy_transparency() {
    let store = local_store("s2");
    let proxied = store.proxy(vec![1, 2, 3], ProxyOptions::default()).unwrap();
    let mut p = proxied.into_proxy().unwrap();

    assert_eq!(p.len(), 3);
    assert_eq!(p[0], 1);
    assert_eq!(p.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

    p.push(4);
    assert_eq!(*p, vec![1, 2, 3, 4]);
}

/// S3. Proxy identity under serialization: a serialized-then-deserialized
/// proxy carries only the factory, is unresolved, and forces correctly.
#[test]
fn s3_proxy_identity_under_serialization() {
    let store = local_store("s3");
    let proxied = store.proxy("hello".to_string(), ProxyOptions::default()).unwrap();
    let p = proxied.into_proxy().unwrap();

    let bytes = bincode::serialize(&p).unwrap();
    let q: proxystore_proxy::Proxy<proxystore_store::StoreFactory<String>> = bincode::deserialize(&bytes).unwrap();
    assert!(!q.is_resolved());

    let joined = format!("{} world", *q);
    assert_eq!(joined, "hello world");
    assert!(q.is_resolved());
}

/// S4. Cache behavior: with cache_size=1, the second `get` evicts the
/// first key's cached entry.
#[test]
fn s4_cache_eviction_under_size_one() {
    let store = Store::new("s4".to_string(), Box::new(LocalConnector::new()), CodecKind::Bincode, 1, false, false).unwrap();

    let k1 = store.put(&"a".to_string()).unwrap();
    let k2 = store.put(&"b".to_string()).unwrap();
    let _: String = store.get(&k1).unwrap().unwrap();
    let _: String = store.get(&k2).unwrap().unwrap();

    assert!(!store.is_cached(&k1));
    assert!(store.is_cached(&k2));
}

/// S7. Missing-key resolution: forcing a proxy built over a key that was
/// never put raises a missing-key error naming the key, the connector's
/// kind, and the store's name.
#[test]
fn s7_missing_key_resolution_names_key_connector_and_store() {
    let store = local_store("s7");
    let fake_key = proxystore_connectors::Key::Local(proxystore_connectors::key::LocalKey(999_999));
    let p: proxystore_proxy::Proxy<proxystore_store::StoreFactory<String>> = store.proxy_from_key(fake_key.clone(), false);

    let err = p.factory().resolve().unwrap_err();
    match err {
        proxystore_store::FactoryError::MissingKey { key, connector, store: store_name } => {
            assert_eq!(key, fake_key);
            assert_eq!(connector, "local");
            assert_eq!(store_name, "s7");
        }
        other => panic!("expected MissingKey, got {other:?}"),
    }
}

/// A Store built over a `FileConnector` round-trips through a real
/// on-disk directory, and its `StoreConfig` can rebuild an observationally
/// equivalent Store in a fresh process (spec §8 property 5), the scenario
/// a proxy actually depends on when it resolves in a new process.
#[test]
fn store_config_round_trip_rebuilds_an_equivalent_file_backed_store() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FileConnector::new(dir.path().to_path_buf(), false).unwrap();
    let store = Store::new("file-rt".to_string(), Box::new(connector), CodecKind::Bincode, 16, false, false).unwrap();

    let key = store.put(&vec![9_u8, 8, 7]).unwrap();
    let config = store.config();

    let rebuilt = Store::from_config(&config).unwrap();
    let value: Vec<u8> = rebuilt.get(&key).unwrap().unwrap();
    assert_eq!(value, vec![9, 8, 7]);
    assert_eq!(rebuilt.config(), config);
}
