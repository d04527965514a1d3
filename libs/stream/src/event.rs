//! The wire event a [`crate::Producer`] publishes and a [`crate::Consumer`]
//! decodes (spec §4.8).
//!
//! The reference implementation carries `key_type_path` + `raw_key_tuple`
//! because Python keys are untyped tuples reconstructed via a dynamic class
//! lookup. Rust's `Key` is already a closed, directly (de)serializable enum
//! (see `proxystore-connectors`), so the event just carries it; a Key
//! variant tag takes the place of the dynamic type path.

use proxystore_connectors::Key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub key: Key,
    pub evict: bool,
}
