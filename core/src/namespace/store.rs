//! In-memory grain store.
//!
//! Holds the live mapping every read consults. It is seeded once at startup
//! from the fact source; after that, only the persistence layer writes to
//! it, and only at the top level.

use serde_json::Value;

use super::path::{self, GrainPath};
use super::sanitize::sanitize;
use crate::types::config::DEFAULT_DELIMITER;
use crate::types::value::{is_truthy, GrainMap};


/// The live grain mapping plus the delimiter used for nested keys.
#[derive(Debug, Clone)]
pub struct GrainStore {
    data: GrainMap,
    delimiter: String,
}

impl GrainStore {
    /// Create an empty store using the default `:` delimiter.
    pub fn new() -> Self {
        GrainStore {
            data: GrainMap::new(),
            delimiter: DEFAULT_DELIMITER.into(),
        }
    }

    /// Create a store seeded with `data`.
    pub fn from_map(data: GrainMap) -> Self {
        GrainStore {
            data,
            delimiter: DEFAULT_DELIMITER.into(),
        }
    }

    /// Use `delimiter` for nested keys instead of `:`.
    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Replace all data (used on startup).
    pub fn load(&mut self, data: GrainMap) {
        self.data = data;
    }

    /// Read the value at a delimited key, or `default` if any segment is
    /// missing.
    pub fn get(&self, key: &str, default: Value) -> Value {
        path::get(&self.data, key, default, &self.delimiter)
    }

    /// `get` with an explicit delimiter for this call only.
    pub fn get_with_delimiter(&self, key: &str, default: Value, delimiter: &str) -> Value {
        path::get(&self.data, key, default, delimiter)
    }

    /// Borrow the value at a delimited key.
    pub fn resolve(&self, key: &str) -> Option<&Value> {
        path::traverse(&self.data, &GrainPath::parse(key, &self.delimiter))
    }

    /// Plain top-level lookup; the key is not split.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// True if the value at `key` exists and is truthy.
    pub fn has_value(&self, key: &str) -> bool {
        self.resolve(key).map_or(false, is_truthy)
    }

    /// All grains, optionally with identifying top-level values redacted.
    pub fn items(&self, sanitized: bool) -> GrainMap {
        if !sanitized {
            return self.data.clone();
        }
        self.data
            .iter()
            .map(|(k, v)| (k.clone(), sanitize(k, v)))
            .collect()
    }

    /// The requested top-level grains that exist; missing keys are skipped.
    pub fn item<S: AsRef<str>>(&self, keys: &[S], sanitized: bool) -> GrainMap {
        let mut out = GrainMap::new();
        for key in keys {
            let key = key.as_ref();
            if let Some(v) = self.data.get(key) {
                let v = if sanitized { sanitize(key, v) } else { v.clone() };
                out.insert(key.to_string(), v);
            }
        }
        out
    }

    /// Top-level keys, sorted ascending.
    pub fn ls(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Export all data as a reference to the internal map.
    pub fn export(&self) -> &GrainMap {
        &self.data
    }

    /// Number of top-level grains.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the store has no grains.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // -------------------------------------------------------------------
    // Top-level writes, reserved for the persistence layer
    // -------------------------------------------------------------------

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }
}

impl Default for GrainStore {
    fn default() -> Self {
        Self::new()
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
