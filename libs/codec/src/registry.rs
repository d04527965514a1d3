//! Named codec strategies.
//!
//! The Python original lets a Store embed an arbitrary callable as its
//! serializer/deserializer inside a config dict. That does not survive a
//! static language (see `DESIGN.md`), so this crate replaces it with a small
//! registry of named strategies: a [`CodecKind`] identifies a strategy, and
//! a `StoreConfig` embeds the name rather than a closure.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CodecError, CodecResult};

/// A named, serializable choice of byte <-> object strategy.
///
/// `Default` selects the self-describing default codec (bincode), matching
/// spec §2's "Pluggable; default produces self-describing bytes suitable
/// for round-trip."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    #[default]
    Bincode,
    Json,
}

impl CodecKind {
    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Bincode => "bincode",
            CodecKind::Json => "json",
        }
    }

    /// Resolve a codec kind from a short name, for configs loaded as plain
    /// strings (e.g. from TOML or a CLI flag).
    pub fn from_name(name: &str) -> CodecResult<Self> {
        match name {
            "bincode" => Ok(CodecKind::Bincode),
            "json" => Ok(CodecKind::Json),
            other => Err(CodecError::UnknownKind(other.to_string())),
        }
    }

    pub fn serialize<T: Serialize>(&self, obj: &T) -> CodecResult<Vec<u8>> {
        match self {
            CodecKind::Bincode => bincode::serialize(obj).map_err(|e| CodecError::Encode {
                kind: self.name(),
                message: e.to_string(),
            }),
            CodecKind::Json => serde_json::to_vec(obj).map_err(|e| CodecError::Encode {
                kind: self.name(),
                message: e.to_string(),
            }),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            CodecKind::Bincode => bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
                kind: self.name(),
                len: bytes.len(),
                message: e.to_string(),
            }),
            CodecKind::Json => serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
                kind: self.name(),
                len: bytes.len(),
                message: e.to_string(),
            }),
        }
    }
}

/// A per-call deserializer override, matching the Store's `get(key,
/// deserializer=...)` parameter. Boxed so callers can pass closures that
/// post-process the decoded value without widening the `Store` API.
pub type Deserializer<T> = std::sync::Arc<dyn Fn(&[u8]) -> CodecResult<T> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn bincode_round_trip() {
        let p = Point { x: 1, y: 2 };
        let bytes = CodecKind::Bincode.serialize(&p).unwrap();
        let back: Point = CodecKind::Bincode.deserialize(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn json_round_trip() {
        let p = Point { x: 3, y: 4 };
        let bytes = CodecKind::Json.serialize(&p).unwrap();
        let back: Point = CodecKind::Json.deserialize(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert!(CodecKind::from_name("yaml").is_err());
        assert_eq!(CodecKind::from_name("json").unwrap(), CodecKind::Json);
    }

    #[test]
    fn default_is_bincode() {
        assert_eq!(CodecKind::default(), CodecKind::Bincode);
    }
}
