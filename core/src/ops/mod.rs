//! Higher-level grain operations built on the store and the overlay:
//! list mutation, lookup tables, and one-time values.

pub mod hash;
pub mod list;
pub mod lookup;

pub use hash::get_or_set_hash;
pub use list::{append, remove};
pub use lookup::filter_by;

use serde_json::Value;

use crate::error::{GrainsError, Result};
use crate::namespace::{GrainPath, GrainStore};
use crate::persist::PersistentOverlay;
use crate::types::value::{dict_from_path, remove_at_path, set_at_path, GrainMap};


/// Persist `value` at a possibly nested `key`.
///
/// Writes always happen at the top level, so a nested key rewrites its
/// whole top-level grain with the new value spliced in. With `destructive`,
/// a null value removes the addressed entry instead. A scalar or a list
/// without the addressed element on the path is a `PathConflict`, and
/// nothing is written.
pub(crate) fn persist_at(
    store: &mut GrainStore,
    overlay: &PersistentOverlay,
    key: &str,
    value: Value,
    destructive: bool,
) -> Result<GrainMap> {
    let path = GrainPath::parse(key, store.delimiter());
    let delete = value.is_null() && destructive;
    if !path.is_nested() {
        return if delete {
            overlay.delete_value(store, key, true)
        } else {
            overlay.set_value(store, key, value, destructive)
        };
    }

    let Some(mut top) = store.lookup(path.head()).cloned() else {
        if delete {
            return overlay.set_values(store, &Value::Object(GrainMap::new()), false);
        }
        let top = dict_from_path(path.rest(), value);
        return overlay.set_value(store, path.head(), top, false);
    };

    if delete {
        remove_at_path(&mut top, path.rest());
    } else if !set_at_path(&mut top, path.rest(), value) {
        return Err(GrainsError::PathConflict { key: key.to_string() });
    }
    overlay.set_value(store, path.head(), top, false)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::Settings;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PersistentOverlay, GrainStore) {
        let dir = TempDir::new().unwrap();
        let overlay = PersistentOverlay::new(&Settings::defaults(dir.path()));
        let mut store = GrainStore::new();
        store.insert("os", json!("Debian"));
        store.insert("pkg", json!({"apache": "httpd", "nginx": "nginx"}));
        (dir, overlay, store)
    }

    #[test]
    fn nested_set_splices_into_top_level() {
        let (_dir, overlay, mut store) = setup();
        persist_at(&mut store, &overlay, "pkg:apache", json!("apache2"), false).unwrap();
        assert_eq!(store.get("pkg", json!(null)), json!({"apache": "apache2", "nginx": "nginx"}));
        assert!(store.lookup("pkg:apache").is_none());
        let on_disk = overlay.read().unwrap();
        assert_eq!(on_disk.get("pkg"), Some(&json!({"apache": "apache2", "nginx": "nginx"})));
    }

    #[test]
    fn nested_set_on_missing_grain_builds_mapping() {
        let (_dir, overlay, mut store) = setup();
        persist_at(&mut store, &overlay, "mysql:server:port", json!(3306), false).unwrap();
        assert_eq!(store.get("mysql", json!(null)), json!({"server": {"port": 3306}}));
    }

    #[test]
    fn nested_set_through_scalar_is_conflict() {
        let (dir, overlay, mut store) = setup();
        match persist_at(&mut store, &overlay, "os:tags", json!(["x"]), false) {
            Err(GrainsError::PathConflict { key }) => assert_eq!(key, "os:tags"),
            other => panic!("expected PathConflict, got {:?}", other),
        }
        assert_eq!(store.get("os", json!(null)), json!("Debian"));
        assert!(!dir.path().join("grains").exists());
    }

    #[test]
    fn nested_destructive_delete_removes_leaf() {
        let (_dir, overlay, mut store) = setup();
        persist_at(&mut store, &overlay, "pkg:nginx", Value::Null, true).unwrap();
        assert_eq!(store.get("pkg", json!(null)), json!({"apache": "httpd"}));
    }

    #[test]
    fn nested_destructive_delete_of_missing_grain_writes_nothing_new() {
        let (_dir, overlay, mut store) = setup();
        let ret = persist_at(&mut store, &overlay, "gpu:model", Value::Null, true).unwrap();
        assert!(ret.is_empty());
        assert!(store.lookup("gpu").is_none());
        assert!(overlay.read().unwrap().is_empty());
    }
}
