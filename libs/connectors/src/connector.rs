//! The `Connector` trait: the byte-level backend abstraction (spec §4.2).

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorResult;
use crate::key::Key;

/// Reconstruction record for a Connector, matching spec §3's `StoreConfig`
/// connector field: a fully-qualified kind name plus a JSON options blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectorConfig {
    pub kind: String,
    pub options: serde_json::Value,
}

/// Byte-level backend for object storage.
///
/// A Connector is oblivious to object semantics: it only ever sees and
/// returns bytes. `put` always allocates a fresh key (spec's Open Question
/// on put-deduplication is resolved uniformly: no connector deduplicates).
pub trait Connector: Debug + Send + Sync {
    /// Persist `obj` under a freshly allocated key.
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key>;

    /// Order-preserving batch put.
    fn put_batch(&self, objs: &[Vec<u8>]) -> ConnectorResult<Vec<Key>> {
        objs.iter().map(|o| self.put(o)).collect()
    }

    /// Exact bytes for `key`, or `None` if not present.
    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>>;

    /// Order-preserving batch get.
    fn get_batch(&self, keys: &[Key]) -> ConnectorResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    /// Presence query.
    fn exists(&self, key: &Key) -> ConnectorResult<bool>;

    /// Idempotent delete; a missing key is not an error.
    fn evict(&self, key: &Key) -> ConnectorResult<()>;

    /// Release resources. May purge persisted data depending on
    /// configuration (e.g. `FileConnector`'s clear-on-close policy).
    fn close(&self) -> ConnectorResult<()>;

    /// JSON-serializable reconstruction record.
    fn config(&self) -> ConnectorConfig;

    /// Allocate a key before the object backing it exists. Only connectors
    /// that support the deferrable extension (used by `ProxyFuture`)
    /// override this.
    fn new_key(&self) -> ConnectorResult<Key> {
        Err(crate::error::ConnectorError::Unsupported {
            connector: self.kind_name(),
            op: "new_key",
        })
    }

    /// Fulfil a key allocated by `new_key` with its object bytes.
    fn set(&self, _key: &Key, _obj: &[u8]) -> ConnectorResult<()> {
        Err(crate::error::ConnectorError::Unsupported {
            connector: self.kind_name(),
            op: "set",
        })
    }

    /// Short name used in error messages and the `Unsupported` variant.
    fn kind_name(&self) -> &'static str;
}
