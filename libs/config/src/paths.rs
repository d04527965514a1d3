//! Persisted state layout (spec §6): one directory per configured endpoint
//! under `$PROXYSTORE_HOME`, falling back to `$XDG_DATA_HOME/proxystore`,
//! falling back to `~/.local/share/proxystore`.

use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};

/// The root directory all endpoint state lives under.
pub fn home_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PROXYSTORE_HOME") {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(dir).join("proxystore");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("proxystore")
}

/// Directory for one named endpoint's state: `config.toml`, `daemon.pid`,
/// `log.txt`, and `blobs.db` when persistent storage is enabled.
pub fn endpoint_dir(name: &str) -> PathBuf {
    home_dir().join(name)
}

pub fn config_path(name: &str) -> PathBuf {
    endpoint_dir(name).join("config.toml")
}

pub fn pid_path(name: &str) -> PathBuf {
    endpoint_dir(name).join("daemon.pid")
}

pub fn log_path(name: &str) -> PathBuf {
    endpoint_dir(name).join("log.txt")
}

pub fn blobs_path(name: &str) -> PathBuf {
    endpoint_dir(name).join("blobs.db")
}

/// Names of every endpoint with a state directory under the home dir.
pub fn list_endpoint_names() -> ConfigResult<Vec<String>> {
    let home = home_dir();
    if !home.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&home).map_err(|e| ConfigError::Io {
        path: home.display().to_string(),
        message: e.to_string(),
    })? {
        let entry = entry.map_err(|e| ConfigError::Io {
            path: home.display().to_string(),
            message: e.to_string(),
        })?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
