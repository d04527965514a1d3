//! Relay server configuration (spec §6).

use std::path::{Path, PathBuf};

use config_crate::{Config, File};
use serde::{Deserialize, Serialize};

use crate::endpoint::RelayAuthConfig;
use crate::error::{ConfigError, ConfigResult};

fn default_port() -> u32 {
    8700
}

fn default_log_level() -> String {
    "INFO".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayLoggingConfig {
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub default_level: String,
    #[serde(default = "default_log_level")]
    pub websockets_level: String,
    pub current_client_interval: Option<u64>,
    pub current_client_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u32,
    pub certfile: Option<PathBuf>,
    pub keyfile: Option<PathBuf>,
    pub max_message_bytes: Option<usize>,
    pub auth: Option<RelayAuthConfig>,
    #[serde(default)]
    pub logging: RelayLoggingConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            certfile: None,
            keyfile: None,
            max_message_bytes: None,
            auth: None,
            logging: RelayLoggingConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 || self.port > 65535 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.certfile.is_some() != self.keyfile.is_some() {
            return Err(ConfigError::Io {
                path: "certfile/keyfile".to_string(),
                message: "TLS requires both certfile and keyfile, or neither".to_string(),
            });
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

    #[test]
    fn defaults_match_spec() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.port, 8700);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_mismatched_tls_files() {
        let mut cfg = RelayConfig::default();
        cfg.certfile = Some(PathBuf::from("cert.pem"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_from_toml_str() {
        let toml = r#"
            host = "127.0.0.1"
            port = 9000
            max_message_bytes = 1048576

            [logging]
            default_level = "DEBUG"
        "#;
        let cfg = RelayConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.max_message_bytes, Some(1048576));
        assert_eq!(cfg.logging.default_level, "DEBUG");
    }
}
