//! Override-file persistence.
//!
//! Every write re-reads the whole override file, merges the new values into
//! it and into the live store, rewrites the file atomically
//! (write-to-temp then rename), touches the refresh signal, and calls the
//! resync hook. The live store is authoritative: if the file cannot be
//! written the in-memory update stands and the failure is logged. Only a
//! lock held by another writer past the timeout aborts a write.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::lock::{self, LockError};
use super::refresh::{touch_refresh_signal, NoopResync, Resync};
use crate::error::{GrainsError, Result};
use crate::namespace::GrainStore;
use crate::types::config::Settings;
use crate::types::value::{from_yaml, GrainMap};


/// Reads and rewrites the override file on behalf of a `GrainStore`.
pub struct PersistentOverlay {
    settings: Settings,
    resync: Box<dyn Resync>,
}

impl PersistentOverlay {
    /// Create an overlay whose file locations come from `settings`.
    pub fn new(settings: &Settings) -> Self {
        PersistentOverlay {
            settings: settings.clone(),
            resync: Box::new(NoopResync),
        }
    }

    /// Replace the resync hook.
    pub fn with_resync(mut self, resync: Box<dyn Resync>) -> Self {
        self.resync = resync;
        self
    }

    /// Path of the override file for this call.
    pub fn overlay_path(&self) -> PathBuf {
        self.settings.overlay_path()
    }

    /// Load the override file.
    ///
    /// A missing or blank file is an empty mapping. A file that parses to
    /// something other than a mapping is also treated as empty. A file
    /// that cannot be read or parsed is an error, so a write never
    /// clobbers content it did not understand.
    pub fn read(&self) -> Result<GrainMap> {
        read_overlay(&self.overlay_path())
    }

    /// Merge `new_values` into the override file and the store.
    ///
    /// With `destructive`, a null value deletes its key from both instead
    /// of storing null. Returns `new_values` as given.
    pub fn set_values(
        &self,
        store: &mut GrainStore,
        new_values: &Value,
        destructive: bool,
    ) -> Result<GrainMap> {
        let updates = match new_values {
            Value::Object(map) => map,
            _ => {
                return Err(GrainsError::InvalidArgument(
                    "setvals grains must be a dictionary.".into(),
                ))
            }
        };

        let path = self.overlay_path();
        let lock_path = lock::lock_path_for(&path);
        let _guard = match lock::acquire(&lock_path, self.settings.lock_timeout_ms) {
            Ok(guard) => Some(guard),
            Err(e @ LockError::Timeout { .. }) => {
                return Err(GrainsError::PersistenceWriteError {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            }
            Err(e @ LockError::Unavailable { .. }) => {
                warn!("{}; writing grains without the lock", e);
                None
            }
        };

        let mut on_disk = read_overlay(&path)?;

        for (key, val) in updates {
            if val.is_null() && destructive {
                let from_file = on_disk.remove(key).is_some();
                let from_store = store.remove(key).is_some();
                debug!(key = %key, from_file, from_store, "deleted grain");
            } else {
                on_disk.insert(key.clone(), val.clone());
                store.insert(key, val.clone());
            }
        }

        match write_overlay(&path, &on_disk) {
            Ok(()) => info!(
                path = %path.display(),
                keys = ?updates.keys().collect::<Vec<_>>(),
                "persisted grains"
            ),
            Err(reason) => {
                let err = GrainsError::PersistenceWriteError {
                    path: path.clone(),
                    reason,
                };
                error!("{}. Check permissions.", err);
            }
        }

        let refresh = self.settings.refresh_path();
        if let Err(e) = touch_refresh_signal(&refresh) {
            error!("Unable to write to cache file {}: {}. Check permissions.", refresh.display(), e);
        }

        if let Err(e) = self.resync.resync() {
            warn!("grain resync failed: {}", e);
        }

        Ok(updates.clone())
    }

    /// Persist a single key.
    pub fn set_value(
        &self,
        store: &mut GrainStore,
        key: &str,
        val: Value,
        destructive: bool,
    ) -> Result<GrainMap> {
        let mut one = GrainMap::new();
        one.insert(key.to_string(), val);
        self.set_values(store, &Value::Object(one), destructive)
    }

    /// Null out a key; with `destructive`, remove it entirely.
    pub fn delete_value(
        &self,
        store: &mut GrainStore,
        key: &str,
        destructive: bool,
    ) -> Result<GrainMap> {
        self.set_value(store, key, Value::Null, destructive)
    }
}


// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read an override file at `path` into a mapping.
pub fn read_overlay(path: &Path) -> Result<GrainMap> {
    if !path.is_file() {
        return Ok(GrainMap::new());
    }
    let content = fs::read_to_string(path).map_err(|e| GrainsError::PersistenceReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_overlay(&content).map_err(|reason| GrainsError::PersistenceReadError {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse override-file YAML. Blank and comment-only documents are empty.
/// Number and boolean keys are read as strings.
pub fn parse_overlay(content: &str) -> std::result::Result<GrainMap, String> {
    if is_blank_yaml(content) {
        return Ok(GrainMap::new());
    }

    let doc: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    match from_yaml(doc)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(GrainMap::new()),
        other => {
            warn!(
                "grains file holds a {} instead of a mapping; starting from empty",
                kind_of(&other)
            );
            Ok(GrainMap::new())
        }
    }
}

/// True when `content` holds nothing but whitespace and comments.
pub(crate) fn is_blank_yaml(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l.starts_with('#'))
}

/// Serialize `grains` as block-style YAML and replace `path` atomically.
pub fn write_overlay(path: &Path, grains: &GrainMap) -> std::result::Result<(), String> {
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid grains path {}", path.display()))?;
    fs::create_dir_all(parent)
        .map_err(|e| format!("failed to create dir {}: {}", parent.display(), e))?;

    let yaml = serde_yaml::to_string(grains)
        .map_err(|e| format!("failed to serialize grains: {}", e))?;

    let tmp_path = parent.join(".grains.tmp");
    fs::write(&tmp_path, &yaml)
        .map_err(|e| format!("failed to write {}: {}", tmp_path.display(), e))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        format!("failed to rename {} to {}: {}", tmp_path.display(), path.display(), e)
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
