//! HTTP client connector over a peer-to-peer endpoint daemon (spec §4.5).
//! Talks to the endpoint's `/set`, `/get`, `/exists`, `/evict` surface;
//! the daemon itself resolves requests against its local storage or
//! forwards them over its WebRTC peer fabric to the owning endpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::{Connector, ConnectorConfig};
use crate::error::{ConnectorError, ConnectorResult};
use crate::key::{EndpointKey, Key};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EndpointOptions {
    endpoint_uuid: Uuid,
    base_url: String,
}

#[derive(Debug)]
pub struct EndpointConnector {
    endpoint_uuid: Uuid,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl EndpointConnector {
    pub fn new(endpoint_uuid: Uuid, base_url: impl Into<String>) -> ConnectorResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ConnectorError::Configuration {
                connector: "endpoint",
                message: e.to_string(),
            })?;
        Ok(Self {
            endpoint_uuid,
            base_url: base_url.into(),
            client,
        })
    }

    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        let opts: EndpointOptions =
            serde_json::from_value(config.options.clone()).map_err(|e| {
                ConnectorError::Configuration {
                    connector: "endpoint",
                    message: e.to_string(),
                }
            })?;
        Self::new(opts.endpoint_uuid, opts.base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn backend_err(e: reqwest::Error) -> ConnectorError {
        ConnectorError::Backend {
            connector: "endpoint",
            message: e.to_string(),
        }
    }
}

impl Connector for EndpointConnector {
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key> {
        let object_id = Uuid::new_v4();
        let resp = self
            .client
            .post(self.url(&format!("/set/{object_id}")))
            .body(obj.to_vec())
            .send()
            .map_err(Self::backend_err)?;
        if !resp.status().is_success() {
            return Err(ConnectorError::Backend {
                connector: "endpoint",
                message: format!("set returned status {}", resp.status()),
            });
        }
        Ok(Key::Endpoint(EndpointKey {
            object_id,
            endpoint_uuid: self.endpoint_uuid,
        }))
    }

    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>> {
        let Key::Endpoint(ekey) = key else {
            return Ok(None);
        };
        let resp = self
            .client
            .get(self.url(&format!(
                "/get/{}?endpoint={}",
                ekey.object_id, ekey.endpoint_uuid
            )))
            .send()
            .map_err(Self::backend_err)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ConnectorError::Backend {
                connector: "endpoint",
                message: format!("get returned status {}", resp.status()),
            });
        }
        Ok(Some(resp.bytes().map_err(Self::backend_err)?.to_vec()))
    }

    fn exists(&self, key: &Key) -> ConnectorResult<bool> {
        let Key::Endpoint(ekey) = key else {
            return Ok(false);
        };
        let resp = self
            .client
            .get(self.url(&format!(
                "/exists/{}?endpoint={}",
                ekey.object_id, ekey.endpoint_uuid
            )))
            .send()
            .map_err(Self::backend_err)?;
        if !resp.status().is_success() {
            return Err(ConnectorError::Backend {
                connector: "endpoint",
                message: format!("exists returned status {}", resp.status()),
            });
        }
        resp.json::<bool>().map_err(Self::backend_err)
    }

    fn evict(&self, key: &Key) -> ConnectorResult<()> {
        let Key::Endpoint(ekey) = key else {
            return Ok(());
        };
        let resp = self
            .client
            .delete(self.url(&format!(
                "/evict/{}?endpoint={}",
                ekey.object_id, ekey.endpoint_uuid
            )))
            .send()
            .map_err(Self::backend_err)?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(ConnectorError::Backend {
                connector: "endpoint",
                message: format!("evict returned status {}", resp.status()),
            });
        }
        Ok(())
    }

    fn close(&self) -> ConnectorResult<()> {
        Ok(())
    }

    fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            kind: "endpoint".to_string(),
            options: serde_json::to_value(EndpointOptions {
                endpoint_uuid: self.endpoint_uuid,
                base_url: self.base_url.clone(),
            })
            .unwrap(),
        }
    }

    fn new_key(&self) -> ConnectorResult<Key> {
        Ok(Key::Endpoint(EndpointKey {
            object_id: Uuid::new_v4(),
            endpoint_uuid: self.endpoint_uuid,
        }))
    }

    fn set(&self, key: &Key, obj: &[u8]) -> ConnectorResult<()> {
        let Key::Endpoint(ekey) = key else {
            return Err(ConnectorError::Configuration {
                connector: "endpoint",
                message: "set called with a non-endpoint key".into(),
            });
        };
        let resp = self
            .client
            .post(self.url(&format!("/set/{}", ekey.object_id)))
            .body(obj.to_vec())
            .send()
            .map_err(Self::backend_err)?;
        if !resp.status().is_success() {
            return Err(ConnectorError::Backend {
                connector: "endpoint",
                message: format!("set returned status {}", resp.status()),
            });
        }
        Ok(())
    }

    fn kind_name(&self) -> &'static str {
        "endpoint"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_without_a_live_daemon() {
        let uuid = Uuid::new_v4();
        let c = EndpointConnector::new(uuid, "http://127.0.0.1:8765").unwrap();
        let cfg = c.config();
        let c2 = EndpointConnector::from_config(&cfg).unwrap();
        assert_eq!(c2.config(), cfg);
    }

    #[test]
    fn new_key_allocates_before_any_object_exists() {
        let uuid = Uuid::new_v4();
        let c = EndpointConnector::new(uuid, "http://127.0.0.1:8765").unwrap();
        let k1 = c.new_key().unwrap();
        let k2 = c.new_key().unwrap();
        assert_ne!(k1, k2);
    }
}
