//! Filesystem-backed connector. Maps keys to filenames under a configured
//! root directory. Writes are atomic (temp file + rename); `exists`/`get`
//! read whole files; `evict` unlinks.

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::{Connector, ConnectorConfig};
use crate::error::{ConnectorError, ConnectorResult};
use crate::key::{FileKey, Key};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileOptions {
    store_dir: PathBuf,
    #[serde(default)]
    clear_on_close: bool,
}

#[derive(Debug)]
pub struct FileConnector {
    store_dir: PathBuf,
    clear_on_close: bool,
}

impl FileConnector {
    pub fn new(store_dir: impl Into<PathBuf>, clear_on_close: bool) -> ConnectorResult<Self> {
        let store_dir = store_dir.into();
        fs::create_dir_all(&store_dir).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to create store dir {}: {e}", store_dir.display()),
        })?;
        Ok(Self {
            store_dir,
            clear_on_close,
        })
    }

    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        let opts: FileOptions =
            serde_json::from_value(config.options.clone()).map_err(|e| {
                ConnectorError::Configuration {
                    connector: "file",
                    message: e.to_string(),
                }
            })?;
        Self::new(opts.store_dir, opts.clear_on_close)
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.store_dir.join(filename)
    }
}

impl Connector for FileConnector {
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key> {
        let filename = Uuid::new_v4().to_string();
        let final_path = self.path_for(&filename);
        let tmp_path = self.store_dir.join(format!(".{filename}.tmp"));

        let mut tmp = File::create(&tmp_path).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to create temp file: {e}"),
        })?;
        tmp.write_all(obj).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to write temp file: {e}"),
        })?;
        tmp.sync_all().ok();
        fs::rename(&tmp_path, &final_path).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to rename temp file into place: {e}"),
        })?;

        Ok(Key::File(FileKey(filename)))
    }

    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>> {
        let Key::File(FileKey(filename)) = key else {
            return Ok(None);
        };
        let path = self.path_for(filename);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConnectorError::Backend {
                connector: "file",
                message: format!("failed to read {}: {e}", path.display()),
            }),
        }
    }

    fn exists(&self, key: &Key) -> ConnectorResult<bool> {
        let Key::File(FileKey(filename)) = key else {
            return Ok(false);
        };
        Ok(self.path_for(filename).exists())
    }

    fn evict(&self, key: &Key) -> ConnectorResult<()> {
        let Key::File(FileKey(filename)) = key else {
            return Ok(());
        };
        match fs::remove_file(self.path_for(filename)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConnectorError::Backend {
                connector: "file",
                message: format!("failed to evict {filename}: {e}"),
            }),
        }
    }

    fn close(&self) -> ConnectorResult<()> {
        if self.clear_on_close {
            fs::remove_dir_all(&self.store_dir).ok();
        }
        Ok(())
    }

    fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            kind: "file".to_string(),
            options: serde_json::to_value(FileOptions {
                store_dir: self.store_dir.clone(),
                clear_on_close: self.clear_on_close,
            })
            .unwrap(),
        }
    }

    fn new_key(&self) -> ConnectorResult<Key> {
        Ok(Key::File(FileKey(Uuid::new_v4().to_string())))
    }

    fn set(&self, key: &Key, obj: &[u8]) -> ConnectorResult<()> {
        let Key::File(FileKey(filename)) = key else {
            return Err(ConnectorError::Unsupported {
                connector: self.kind_name(),
                op: "set",
            });
        };
        let final_path = self.path_for(filename);
        let tmp_path = self.store_dir.join(format!(".{filename}.tmp"));
        let mut tmp = File::create(&tmp_path).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to create temp file: {e}"),
        })?;
        tmp.write_all(obj).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to write temp file: {e}"),
        })?;
        tmp.sync_all().ok();
        fs::rename(&tmp_path, &final_path).map_err(|e| ConnectorError::Backend {
            connector: "file",
            message: format!("failed to rename temp file into place: {e}"),
        })?;
        Ok(())
    }

    fn kind_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_get_evict_round_trip() {
        let dir = tempdir().unwrap();
        let c = FileConnector::new(dir.path(), false).unwrap();
        let k = c.put(b"payload").unwrap();
        assert_eq!(c.get(&k).unwrap(), Some(b"payload".to_vec()));
        assert!(c.exists(&k).unwrap());
        c.evict(&k).unwrap();
        assert!(!c.exists(&k).unwrap());
        assert_eq!(c.get(&k).unwrap(), None);
    }

    #[test]
    fn close_with_clear_removes_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let c = FileConnector::new(&root, true).unwrap();
        c.put(b"x").unwrap();
        c.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn config_round_trips() {
        let dir = tempdir().unwrap();
        let c = FileConnector::new(dir.path(), false).unwrap();
        let cfg = c.config();
        let c2 = FileConnector::from_config(&cfg).unwrap();
        assert_eq!(c2.config(), cfg);
    }
}
