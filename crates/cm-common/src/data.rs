//! Raw config data access.
//!
//! The library never reads files or parses YAML/JSON itself; callers hand it
//! already-parsed mapping data through the `ConfigData` capability. A key may
//! be present with a null value — presence and null-ness are distinct, and
//! field resolution treats a null value like an absent key when applying
//! defaults.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Read-only access to raw configuration data.
///
/// Semantically a mapping from string key to arbitrary JSON value. The trait
/// is object-safe so configuration instances can hold any provider behind a
/// `dyn` reference.
pub trait ConfigData {
    /// Whether the key exists in the data, even if its value is null.
    fn present(&self, key: &str) -> bool;

    /// Look up the value for a key, cloning it out of the source.
    fn get(&self, key: &str) -> Option<Value>;
}

impl ConfigData for Map<String, Value> {
    fn present(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        Map::get(self, key).cloned()
    }
}

impl ConfigData for BTreeMap<String, Value> {
    fn present(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        BTreeMap::get(self, key).cloned()
    }
}

/// A JSON value acts as config data when it is an object; any other shape
/// contains no keys.
impl ConfigData for Value {
    fn present(&self, key: &str) -> bool {
        self.as_object().is_some_and(|map| map.contains_key(key))
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.as_object().and_then(|map| map.get(key)).cloned()
    }
}
