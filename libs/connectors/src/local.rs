//! Process-local, in-memory connector. Never persists across processes;
//! useful for tests and as the local leaf of a `MultiConnector`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::connector::{Connector, ConnectorConfig};
use crate::error::ConnectorResult;
use crate::key::{Key, LocalKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LocalOptions {}

#[derive(Debug)]
pub struct LocalConnector {
    counter: AtomicU64,
    data: RwLock<HashMap<u64, Vec<u8>>>,
}

impl LocalConnector {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        let _: LocalOptions = serde_json::from_value(config.options.clone()).map_err(|e| {
            crate::error::ConnectorError::Configuration {
                connector: "local",
                message: e.to_string(),
            }
        })?;
        Ok(Self::new())
    }
}

impl Default for LocalConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for LocalConnector {
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        self.data.write().insert(id, obj.to_vec());
        Ok(Key::Local(LocalKey(id)))
    }

    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>> {
        let Key::Local(LocalKey(id)) = key else {
            return Ok(None);
        };
        Ok(self.data.read().get(id).cloned())
    }

    fn exists(&self, key: &Key) -> ConnectorResult<bool> {
        let Key::Local(LocalKey(id)) = key else {
            return Ok(false);
        };
        Ok(self.data.read().contains_key(id))
    }

    fn evict(&self, key: &Key) -> ConnectorResult<()> {
        if let Key::Local(LocalKey(id)) = key {
            self.data.write().remove(id);
        }
        Ok(())
    }

    fn close(&self) -> ConnectorResult<()> {
        Ok(())
    }

    fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            kind: "local".to_string(),
            options: serde_json::to_value(LocalOptions {}).unwrap(),
        }
    }

    fn new_key(&self) -> ConnectorResult<Key> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Key::Local(LocalKey(id)))
    }

    fn set(&self, key: &Key, obj: &[u8]) -> ConnectorResult<()> {
        let Key::Local(LocalKey(id)) = key else {
            return Err(crate::error::ConnectorError::Unsupported {
                connector: self.kind_name(),
                op: "set",
            });
        };
        self.data.write().insert(*id, obj.to_vec());
        Ok(())
    }

    fn kind_name(&self) -> &'static str {
        "local"
    }
}
