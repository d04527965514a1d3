//! Endpoint daemon configuration (spec §6).

use std::path::{Path, PathBuf};

use config_crate::{Config, File};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigError, ConfigResult};

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayAuthConfig {
    /// `"globus"` or absent; the globus flow is out of scope (spec §1) and
    /// is accepted here only so a config file naming it round-trips.
    pub method: Option<String>,
    #[serde(flatten, default)]
    pub kwargs: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRelayConfig {
    pub address: Option<String>,
    #[serde(default = "default_peer_channels")]
    pub peer_channels: u32,
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
    pub auth: Option<RelayAuthConfig>,
}

fn default_peer_channels() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointStorageConfig {
    pub database_path: Option<PathBuf>,
    pub max_object_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub uuid: Uuid,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u32,
    pub relay: EndpointRelayConfig,
    #[serde(default)]
    pub storage: EndpointStorageConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl EndpointConfig {
    /// Validates every constraint named in spec §6. Called after
    /// construction and after every `from_*` load, matching the reference
    /// pydantic model's validator-on-assignment behavior.
    pub fn validate(&self) -> ConfigResult<()> {
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        if self.port == 0 || self.port > 65535 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if let Some(address) = &self.relay.address {
            if !(address.starts_with("ws://") || address.starts_with("wss://")) {
                return Err(ConfigError::InvalidRelayAddress(address.clone()));
            }
        }
        if self.relay.peer_channels < 1 {
            return Err(ConfigError::InvalidPeerChannels(self.relay.peer_channels));
        }
        if let Some(max) = self.storage.max_object_size {
            if max < 1 {
                return Err(ConfigError::InvalidMaxObjectSize(max));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = Config::builder()
            .add_source(config_crate::File::from_str(s, config_crate::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn read_from(path: &Path) -> ConfigResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn write_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let toml = toml::to_string_pretty(self).map_err(|e| ConfigError::Toml(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(path, toml).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(name: &str) -> EndpointConfig {
        EndpointConfig {
            name: name.to_string(),
            uuid: Uuid::new_v4(),
            host: "127.0.0.1".to_string(),
            port: 8765,
            relay: EndpointRelayConfig {
                address: Some("wss://relay.example.org".to_string()),
                peer_channels: 4,
                verify_certificate: true,
                auth: None,
            },
            storage: EndpointStorageConfig {
                database_path: None,
                max_object_size: Some(16 * 1024 * 1024),
            },
        }
    }

    #[test]
    fn rejects_invalid_name() {
        let mut cfg = sample("bad name!");
        cfg.name = "bad name!".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidName(_))));
    }

    #[test]
    fn rejects_invalid_port() {
        let mut cfg = sample("ep1");
        cfg.port = 70000;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn rejects_non_ws_relay_address() {
        let mut cfg = sample("ep1");
        cfg.relay.address = Some("http://relay.example.org".to_string());
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRelayAddress(_))
        ));
    }

    #[test]
    fn rejects_zero_peer_channels() {
        let mut cfg = sample("ep1");
        cfg.relay.peer_channels = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPeerChannels(_))
        ));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = sample("ep1");
        cfg.write_to(&path).unwrap();
        let loaded = EndpointConfig::read_from(&path).unwrap();
        assert_eq!(loaded.name, cfg.name);
        assert_eq!(loaded.uuid, cfg.uuid);
        assert_eq!(loaded.relay.peer_channels, cfg.relay.peer_channels);
    }
}
