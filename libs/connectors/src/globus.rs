//! Content-addressed files on one filesystem, kept in sync with one or more
//! remote filesystems by submitting asynchronous bulk-transfer tasks.
//!
//! The Globus transfer service itself is an external collaborator (spec
//! §1): its wire protocol is assumed, not modeled. This module specifies
//! only the narrow adapter surface, [`BulkTransferClient`], that a real
//! Globus SDK binding would implement.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::{Connector, ConnectorConfig};
use crate::error::{ConnectorError, ConnectorResult};
use crate::key::{GlobusKey, Key};

/// Status of a submitted bulk-transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Adapter surface for a Globus-like bulk file transfer service. A
/// production binding would submit and poll real Globus transfer tasks;
/// this crate specifies only the contract.
pub trait BulkTransferClient: std::fmt::Debug + Send + Sync {
    /// Submit a transfer of `filename` from the local endpoint to
    /// `dest_endpoint_id`, returning a task id.
    fn submit_transfer(
        &self,
        filename: &str,
        dest_endpoint_id: &str,
    ) -> ConnectorResult<String>;

    /// Poll the status of a previously submitted task.
    fn transfer_status(&self, task_id: &str) -> ConnectorResult<TransferStatus>;

    /// Delete a file on a remote endpoint (used by `evict`).
    fn submit_delete(&self, filename: &str, dest_endpoint_id: &str) -> ConnectorResult<String>;
}

/// A no-op transfer client usable in single-endpoint testing: every
/// "submitted" transfer is immediately `Succeeded`, as if the remote
/// filesystem were actually local. Never used when `endpoints.len() > 1`
/// in production because there would be nothing to synchronize with.
#[derive(Debug, Default)]
pub struct ImmediateTransferClient;

impl BulkTransferClient for ImmediateTransferClient {
    fn submit_transfer(&self, _filename: &str, _dest_endpoint_id: &str) -> ConnectorResult<String> {
        Ok(Uuid::new_v4().to_string())
    }

    fn transfer_status(&self, _task_id: &str) -> ConnectorResult<TransferStatus> {
        Ok(TransferStatus::Succeeded)
    }

    fn submit_delete(&self, _filename: &str, _dest_endpoint_id: &str) -> ConnectorResult<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GlobusEndpoint {
    pub endpoint_id: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GlobusOptions {
    local_endpoint_id: String,
    local_path: PathBuf,
    remote_endpoint_ids: Vec<String>,
    polling_interval_ms: u64,
    polling_timeout_ms: Option<u64>,
}

#[derive(Debug)]
pub struct GlobusConnector {
    local: GlobusEndpoint,
    remote_endpoint_ids: Vec<String>,
    client: std::sync::Arc<dyn BulkTransferClient>,
    polling_interval: Duration,
    polling_timeout: Option<Duration>,
}

impl GlobusConnector {
    /// At least two configured endpoints are required (spec §4.2): the
    /// local endpoint plus one or more remotes to transfer to.
    pub fn new(
        local: GlobusEndpoint,
        remote_endpoint_ids: Vec<String>,
        client: std::sync::Arc<dyn BulkTransferClient>,
        polling_interval: Duration,
        polling_timeout: Option<Duration>,
    ) -> ConnectorResult<Self> {
        if remote_endpoint_ids.is_empty() {
            return Err(ConnectorError::Configuration {
                connector: "globus",
                message: "GlobusConnector requires at least two configured endpoints".into(),
            });
        }
        std::fs::create_dir_all(&local.local_path).map_err(|e| ConnectorError::Backend {
            connector: "globus",
            message: format!("failed to create local path: {e}"),
        })?;
        Ok(Self {
            local,
            remote_endpoint_ids,
            client,
            polling_interval,
            polling_timeout,
        })
    }

    pub fn from_config(
        config: &ConnectorConfig,
        client: std::sync::Arc<dyn BulkTransferClient>,
    ) -> ConnectorResult<Self> {
        let opts: GlobusOptions =
            serde_json::from_value(config.options.clone()).map_err(|e| {
                ConnectorError::Configuration {
                    connector: "globus",
                    message: e.to_string(),
                }
            })?;
        Self::new(
            GlobusEndpoint {
                endpoint_id: opts.local_endpoint_id,
                local_path: opts.local_path,
            },
            opts.remote_endpoint_ids,
            client,
            Duration::from_millis(opts.polling_interval_ms),
            opts.polling_timeout_ms.map(Duration::from_millis),
        )
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.local.local_path.join(filename)
    }

    fn wait_for_tasks(&self, key: &GlobusKey) -> ConnectorResult<bool> {
        let start = Instant::now();
        loop {
            let mut all_done = true;
            for task_id in &key.task_ids {
                match self.client.transfer_status(task_id)? {
                    TransferStatus::Succeeded => {}
                    TransferStatus::Failed => return Ok(false),
                    TransferStatus::Pending => all_done = false,
                }
            }
            if all_done {
                return Ok(true);
            }
            if let Some(timeout) = self.polling_timeout {
                if start.elapsed() >= timeout {
                    return Err(ConnectorError::Timeout {
                        key: Key::Globus(key.clone()),
                    });
                }
            }
            std::thread::sleep(self.polling_interval);
        }
    }
}

impl Connector for GlobusConnector {
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key> {
        let filename = Uuid::new_v4().to_string();
        let path = self.path_for(&filename);
        std::fs::write(&path, obj).map_err(|e| ConnectorError::Backend {
            connector: "globus",
            message: format!("failed to write {}: {e}", path.display()),
        })?;

        let mut task_ids = Vec::with_capacity(self.remote_endpoint_ids.len());
        for remote in &self.remote_endpoint_ids {
            task_ids.push(self.client.submit_transfer(&filename, remote)?);
        }

        Ok(Key::Globus(GlobusKey { filename, task_ids }))
    }

    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>> {
        let Key::Globus(gkey) = key else {
            return Ok(None);
        };
        let path = self.path_for(&gkey.filename);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConnectorError::Backend {
                connector: "globus",
                message: format!("failed to read {}: {e}", path.display()),
            }),
        }
    }

    fn exists(&self, key: &Key) -> ConnectorResult<bool> {
        let Key::Globus(gkey) = key else {
            return Ok(false);
        };
        if !Path::new(&self.path_for(&gkey.filename)).exists() {
            return Ok(false);
        }
        self.wait_for_tasks(gkey)
    }

    fn evict(&self, key: &Key) -> ConnectorResult<()> {
        let Key::Globus(gkey) = key else {
            return Ok(());
        };
        match std::fs::remove_file(self.path_for(&gkey.filename)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConnectorError::Backend {
                    connector: "globus",
                    message: format!("failed to evict {}: {e}", gkey.filename),
                })
            }
        }
        for remote in &self.remote_endpoint_ids {
            self.client.submit_delete(&gkey.filename, remote)?;
        }
        Ok(())
    }

    fn close(&self) -> ConnectorResult<()> {
        Ok(())
    }

    fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            kind: "globus".to_string(),
            options: serde_json::to_value(GlobusOptions {
                local_endpoint_id: self.local.endpoint_id.clone(),
                local_path: self.local.local_path.clone(),
                remote_endpoint_ids: self.remote_endpoint_ids.clone(),
                polling_interval_ms: self.polling_interval.as_millis() as u64,
                polling_timeout_ms: self.polling_timeout.map(|d| d.as_millis() as u64),
            })
            .unwrap(),
        }
    }

    fn kind_name(&self) -> &'static str {
        "globus"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn connector(dir: &Path) -> GlobusConnector {
        GlobusConnector::new(
            GlobusEndpoint {
                endpoint_id: "local".into(),
                local_path: dir.to_path_buf(),
            },
            vec!["remote-1".into()],
            std::sync::Arc::new(ImmediateTransferClient),
            Duration::from_millis(1),
            Some(Duration::from_secs(1)),
        )
        .unwrap()
    }

    #[test]
    fn put_get_evict_round_trip() {
        let dir = tempdir().unwrap();
        let c = connector(dir.path());
        let k = c.put(b"payload").unwrap();
        assert!(c.exists(&k).unwrap());
        assert_eq!(c.get(&k).unwrap(), Some(b"payload".to_vec()));
        c.evict(&k).unwrap();
        assert!(!c.exists(&k).unwrap());
    }

    #[test]
    fn requires_at_least_one_remote_endpoint() {
        let dir = tempdir().unwrap();
        let err = GlobusConnector::new(
            GlobusEndpoint {
                endpoint_id: "local".into(),
                local_path: dir.path().to_path_buf(),
            },
            vec![],
            std::sync::Arc::new(ImmediateTransferClient),
            Duration::from_millis(1),
            None,
        );
        assert!(err.is_err());
    }
}
