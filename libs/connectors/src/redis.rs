//! Thin adapter over an external Redis server. Keys are `(string,)`
//! generated locally; the wire behavior of Redis itself is assumed, not
//! modeled (spec §1: out of scope).

use ::redis::Commands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::{Connector, ConnectorConfig};
use crate::error::{ConnectorError, ConnectorResult};
use crate::key::{Key, RedisKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RedisOptions {
    hostname: String,
    port: u16,
    #[serde(default)]
    flush_on_close: bool,
}

#[derive(Debug)]
pub struct RedisConnector {
    hostname: String,
    port: u16,
    flush_on_close: bool,
    client: ::redis::Client,
}

impl RedisConnector {
    pub fn new(hostname: impl Into<String>, port: u16, flush_on_close: bool) -> ConnectorResult<Self> {
        let hostname = hostname.into();
        let url = format!("redis://{hostname}:{port}");
        let client = ::redis::Client::open(url).map_err(|e| ConnectorError::Configuration {
            connector: "redis",
            message: e.to_string(),
        })?;
        Ok(Self {
            hostname,
            port,
            flush_on_close,
            client,
        })
    }

    pub fn from_config(config: &ConnectorConfig) -> ConnectorResult<Self> {
        let opts: RedisOptions =
            serde_json::from_value(config.options.clone()).map_err(|e| {
                ConnectorError::Configuration {
                    connector: "redis",
                    message: e.to_string(),
                }
            })?;
        Self::new(opts.hostname, opts.port, opts.flush_on_close)
    }

    fn connection(&self) -> ConnectorResult<::redis::Connection> {
        self.client.get_connection().map_err(|e| ConnectorError::Backend {
            connector: "redis",
            message: e.to_string(),
        })
    }
}

impl Connector for RedisConnector {
    fn put(&self, obj: &[u8]) -> ConnectorResult<Key> {
        let key_str = Uuid::new_v4().to_string();
        let mut conn = self.connection()?;
        conn.set::<_, _, ()>(&key_str, obj).map_err(|e| ConnectorError::Backend {
            connector: "redis",
            message: e.to_string(),
        })?;
        Ok(Key::Redis(RedisKey(key_str)))
    }

    fn get(&self, key: &Key) -> ConnectorResult<Option<Vec<u8>>> {
        let Key::Redis(RedisKey(key_str)) = key else {
            return Ok(None);
        };
        let mut conn = self.connection()?;
        conn.get(key_str).map_err(|e| ConnectorError::Backend {
            connector: "redis",
            message: e.to_string(),
        })
    }

    fn exists(&self, key: &Key) -> ConnectorResult<bool> {
        let Key::Redis(RedisKey(key_str)) = key else {
            return Ok(false);
        };
        let mut conn = self.connection()?;
        conn.exists(key_str).map_err(|e| ConnectorError::Backend {
            connector: "redis",
            message: e.to_string(),
        })
    }

    fn evict(&self, key: &Key) -> ConnectorResult<()> {
        let Key::Redis(RedisKey(key_str)) = key else {
            return Ok(());
        };
        let mut conn = self.connection()?;
        conn.del::<_, ()>(key_str).map_err(|e| ConnectorError::Backend {
            connector: "redis",
            message: e.to_string(),
        })
    }

    fn close(&self) -> ConnectorResult<()> {
        if self.flush_on_close {
            let mut conn = self.connection()?;
            let _: () = ::redis::cmd("FLUSHDB")
                .query(&mut conn)
                .map_err(|e| ConnectorError::Backend {
                    connector: "redis",
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn config(&self) -> ConnectorConfig {
        ConnectorConfig {
            kind: "redis".to_string(),
            options: serde_json::to_value(RedisOptions {
                hostname: self.hostname.clone(),
                port: self.port,
                flush_on_close: self.flush_on_close,
            })
            .unwrap(),
        }
    }

    fn kind_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_without_a_live_server() {
        let c = RedisConnector::new("localhost", 6379, true).unwrap();
        let cfg = c.config();
        let c2 = RedisConnector::from_config(&cfg).unwrap();
        assert_eq!(c2.config(), cfg);
    }
}
