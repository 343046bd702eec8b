//! Append/remove on list-valued grains.

use serde_json::Value;
use tracing::debug;

use super::persist_at;
use crate::error::{GrainsError, Result};
use crate::namespace::GrainStore;
use crate::persist::PersistentOverlay;
use crate::types::value::{display_string, GrainMap};


/// Append `val` to the list at `key`, creating the list if the grain is
/// missing. With `convert`, a scalar grain becomes a one-element list first.
pub fn append(
    store: &mut GrainStore,
    overlay: &PersistentOverlay,
    key: &str,
    val: Value,
    convert: bool,
) -> Result<GrainMap> {
    let mut items = match store.get(key, Value::Array(Vec::new())) {
        Value::Array(items) => items,
        other if convert => vec![other],
        _ => return Err(GrainsError::TypeMismatch { key: key.to_string() }),
    };

    if items.contains(&val) {
        return Err(GrainsError::AlreadyPresent {
            key: key.to_string(),
            val: display_string(&val),
        });
    }

    debug!(key, val = %display_string(&val), "appending to grain list");
    items.push(val);
    persist_at(store, overlay, key, Value::Array(items), false)
}


/// Remove the first occurrence of `val` from the list at `key`.
pub fn remove(
    store: &mut GrainStore,
    overlay: &PersistentOverlay,
    key: &str,
    val: &Value,
) -> Result<GrainMap> {
    let mut items = match store.get(key, Value::Array(Vec::new())) {
        Value::Array(items) => items,
        _ => return Err(GrainsError::TypeMismatch { key: key.to_string() }),
    };

    let Some(pos) = items.iter().position(|v| v == val) else {
        return Err(GrainsError::NotPresent {
            key: key.to_string(),
            val: display_string(val),
        });
    };

    debug!(key, val = %display_string(val), "removing from grain list");
    items.remove(pos);
    persist_at(store, overlay, key, Value::Array(items), false)
}
