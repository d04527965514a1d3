//! Connector key types.
//!
//! Every Connector defines its own key shape: a finite ordered tuple of
//! primitives that locates an object within that Connector but carries no
//! information about which Connector it belongs to (spec §3). A Rust
//! `Connector` trait object needs one concrete return type for `put`/`get`,
//! so the built-in connector kinds share a closed `Key` enum rather than
//! each exposing a distinct associated type; `MultiConnector` nests a child
//! key inside `MultiKey` the same way the Python `MultiKey` NamedTuple does.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key returned by [`crate::local::LocalConnector`]. Process-local only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalKey(pub u64);

/// Key returned by [`crate::file::FileConnector`]: the filename under the
/// connector's root directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey(pub String);

/// Key returned by [`crate::redis::RedisConnector`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedisKey(pub String);

/// Key returned by [`crate::globus::GlobusConnector`]. `task_ids` records
/// the outbound bulk-transfer ids that `exists` must wait on before the
/// file is guaranteed present on every configured remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobusKey {
    pub filename: String,
    pub task_ids: Vec<String>,
}

/// Key returned by [`crate::endpoint::EndpointConnector`]: the object id
/// paired with the endpoint that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointKey {
    pub object_id: Uuid,
    pub endpoint_uuid: Uuid,
}

/// Key returned by [`crate::multi::MultiConnector`]: which named child
/// accepted the put, and the key that child returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiKey {
    pub connector_name: String,
    pub connector_key: Box<Key>,
}

/// The union of all built-in connector key shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Local(LocalKey),
    File(FileKey),
    Redis(RedisKey),
    Globus(GlobusKey),
    Endpoint(EndpointKey),
    Multi(MultiKey),
}

impl From<LocalKey> for Key {
    fn from(k: LocalKey) -> Self {
        Key::Local(k)
    }
}
impl From<FileKey> for Key {
    fn from(k: FileKey) -> Self {
        Key::File(k)
    }
}
impl From<RedisKey> for Key {
    fn from(k: RedisKey) -> Self {
        Key::Redis(k)
    }
}
impl From<GlobusKey> for Key {
    fn from(k: GlobusKey) -> Self {
        Key::Globus(k)
    }
}
impl From<EndpointKey> for Key {
    fn from(k: EndpointKey) -> Self {
        Key::Endpoint(k)
    }
}
impl From<MultiKey> for Key {
    fn from(k: MultiKey) -> Self {
        Key::Multi(k)
    }
}
