//! `StoreConfig`: the reconstruction record a [`crate::Store`] round-trips
//! through (spec §3). Resolving `from_config(s.config())` to an
//! observationally equivalent Store is the governing invariant (spec §8.5).

use proxystore_codec::CodecKind;
use proxystore_connectors::ConnectorConfig;
use serde::{Deserialize, Serialize};

fn default_cache_size() -> i64 {
    16
}

fn default_populate_target() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub name: String,
    pub connector: ConnectorConfig,
    /// `None` selects the default codec (bincode); spec §3 phrases this as
    /// "a class path or `null` for default."
    #[serde(default)]
    pub codec: Option<CodecKind>,
    #[serde(default = "default_cache_size")]
    pub cache_size: i64,
    #[serde(default)]
    pub metrics_enabled: bool,
    /// Default value of the proxy-population flag for proxies this Store
    /// constructs that don't override it explicitly.
    #[serde(default = "default_populate_target")]
    pub populate_target: bool,
}

impl StoreConfig {
    pub fn codec_kind(&self) -> CodecKind {
        self.codec.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips() {
        let cfg = StoreConfig {
            name: "s1".to_string(),
            connector: ConnectorConfig {
                kind: "local".to_string(),
                options: serde_json::json!({}),
            },
            codec: None,
            cache_size: 16,
            metrics_enabled: true,
            populate_target: false,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
        assert_eq!(back.codec_kind(), CodecKind::Bincode);
    }
}
