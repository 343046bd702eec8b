//! One-time random values (`get_or_set_hash`).
//!
//! Generates a per-node secret the first time it is asked for and persists
//! it, so every later call returns the same value.

use rand::Rng;
use serde_json::Value;
use tracing::info;

use crate::error::{GrainsError, Result};
use crate::namespace::{GrainPath, GrainStore};
use crate::persist::PersistentOverlay;
use crate::types::value::{dict_from_path, merge_into};

pub const DEFAULT_LENGTH: usize = 8;
pub const DEFAULT_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*(-_=+)";


/// Return the value at `name`, generating and persisting one if absent.
pub fn get_or_set_hash(
    store: &mut GrainStore,
    overlay: &PersistentOverlay,
    name: &str,
    length: usize,
    chars: &str,
) -> Result<Value> {
    get_or_set_hash_with(store, overlay, name, length, chars, &mut rand::thread_rng())
}


/// `get_or_set_hash` with a caller-supplied random source.
pub fn get_or_set_hash_with<R: Rng>(
    store: &mut GrainStore,
    overlay: &PersistentOverlay,
    name: &str,
    length: usize,
    chars: &str,
    rng: &mut R,
) -> Result<Value> {
    if let Some(existing) = store.resolve(name).filter(|v| !v.is_null()) {
        return Ok(existing.clone());
    }

    let secret = Value::String(random_string(length, chars, rng)?);

    let path = GrainPath::parse(name, store.delimiter());
    if path.is_nested() {
        let mut top = store.lookup(path.head()).cloned().unwrap_or(Value::Null);
        match dict_from_path(path.rest(), secret) {
            Value::Object(nested) => merge_into(&mut top, &nested),
            leaf => top = leaf,
        }
        overlay.set_value(store, path.head(), top, false)?;
    } else {
        overlay.set_value(store, name, secret, false)?;
    }
    info!(name, "generated one-time grain value");

    Ok(store.get(name, Value::Null))
}


/// `length` characters drawn independently and uniformly from `chars`.
pub fn random_string<R: Rng>(length: usize, chars: &str, rng: &mut R) -> Result<String> {
    let alphabet: Vec<char> = chars.chars().collect();
    if alphabet.is_empty() {
        return Err(GrainsError::InvalidArgument(
            "get_or_set_hash chars must not be empty.".into(),
        ));
    }
    Ok((0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect())
}
