//! Lookup tables keyed by a grain (`filter_by`).
//!
//! A caller supplies a table such as
//!
//! ```text
//! {"Debian": {"pkg": "apache2"}, "RedHat": {"pkg": "httpd"}}
//! ```
//!
//! and the branch matching the node's `os_family` grain is returned,
//! optionally with an override mapping merged over it. Nothing is written.

use serde_json::Value;

use crate::error::{GrainsError, Result};
use crate::namespace::GrainStore;
use crate::types::value::{display_string, is_truthy, merge_into};

pub const DEFAULT_SELECTOR: &str = "os_family";
pub const DEFAULT_BRANCH: &str = "default";


/// Select the branch of `table` matching the grain `selector`.
///
/// The grain is read with a plain top-level lookup. When it is missing, or
/// its value has no branch, the `default_branch` entry is used. `merge`,
/// when non-empty, must be a mapping and is deep-merged over the branch
/// (or becomes the result if no branch matched).
pub fn filter_by(
    store: &GrainStore,
    table: &Value,
    selector: &str,
    merge: Option<&Value>,
    default_branch: &str,
) -> Result<Value> {
    let Value::Object(table) = table else {
        return Err(GrainsError::InvalidArgument(
            "filter_by lookup table must be a dictionary.".into(),
        ));
    };

    let match_key = store
        .lookup(selector)
        .map(display_string)
        .unwrap_or_else(|| default_branch.to_string());

    let mut branch = table
        .get(&match_key)
        .or_else(|| table.get(default_branch))
        .cloned()
        .unwrap_or(Value::Null);

    if let Some(merge) = merge.filter(|m| is_truthy(m)) {
        let Value::Object(overrides) = merge else {
            return Err(GrainsError::InvalidArgument(
                "filter_by merge argument must be a dictionary.".into(),
            ));
        };
        if branch.is_null() {
            branch = merge.clone();
        } else {
            merge_into(&mut branch, overrides);
        }
    }

    Ok(branch)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(selector: Option<Value>) -> GrainStore {
        let mut s = GrainStore::new();
        if let Some(v) = selector {
            s.insert("os_family", v);
        }
        s
    }

    #[test]
    fn falls_back_to_default_branch_when_grain_missing() {
        let s = store_with(None);
        let table = json!({"A": "x", "B": "y"});
        assert_eq!(filter_by(&s, &table, "os_family", None, "A").unwrap(), json!("x"));
    }

    #[test]
    fn selects_matching_branch() {
        let s = store_with(Some(json!("B")));
        let table = json!({"A": "x", "B": "y"});
        assert_eq!(filter_by(&s, &table, "os_family", None, "A").unwrap(), json!("y"));
    }

    #[test]
    fn unmatched_value_uses_default_branch() {
        let s = store_with(Some(json!("Gentoo")));
        let table = json!({"Debian": "apache2", "default": "httpd"});
        assert_eq!(
            filter_by(&s, &table, DEFAULT_SELECTOR, None, DEFAULT_BRANCH).unwrap(),
            json!("httpd")
        );
    }

    #[test]
    fn no_match_and_no_default_is_null() {
        let s = store_with(Some(json!("Gentoo")));
        let table = json!({"Debian": "apache2"});
        assert_eq!(
            filter_by(&s, &table, DEFAULT_SELECTOR, None, DEFAULT_BRANCH).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn selector_is_not_path_aware() {
        let mut s = GrainStore::new();
        s.insert("os", json!({"family": "B"}));
        let table = json!({"A": "x", "B": "y"});
        assert_eq!(filter_by(&s, &table, "os:family", None, "A").unwrap(), json!("x"));
    }

    #[test]
    fn non_string_selector_matches_display_form() {
        let mut s = GrainStore::new();
        s.insert("osmajorrelease", json!(7));
        let table = json!({"6": "old", "7": "current"});
        assert_eq!(
            filter_by(&s, &table, "osmajorrelease", None, "6").unwrap(),
            json!("current")
        );
    }

    #[test]
    fn merge_deep_merges_into_branch() {
        let s = store_with(Some(json!("xxx")));
        let table = json!({"A": "B", "C": {"D": {"E": "F", "G": "H"}}});
        let merge = json!({"D": {"E": "I"}, "J": "K"});
        assert_eq!(
            filter_by(&s, &table, "os_family", Some(&merge), "C").unwrap(),
            json!({"D": {"E": "I", "G": "H"}, "J": "K"})
        );
    }

    #[test]
    fn merge_becomes_result_when_no_branch() {
        let s = store_with(Some(json!("Gentoo")));
        let table = json!({"Debian": {"pkg": "apache2"}});
        let merge = json!({"pkg": "apache"});
        assert_eq!(
            filter_by(&s, &table, DEFAULT_SELECTOR, Some(&merge), DEFAULT_BRANCH).unwrap(),
            json!({"pkg": "apache"})
        );
    }

    #[test]
    fn merge_must_be_mapping() {
        let s = store_with(Some(json!("Debian")));
        let table = json!({"Debian": {"pkg": "apache2"}});
        match filter_by(&s, &table, DEFAULT_SELECTOR, Some(&json!(["x"])), DEFAULT_BRANCH) {
            Err(GrainsError::InvalidArgument(msg)) => assert!(msg.contains("merge")),
            other => panic!("expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn empty_merge_is_ignored() {
        let s = store_with(Some(json!("Debian")));
        let table = json!({"Debian": "apache2"});
        assert_eq!(
            filter_by(&s, &table, DEFAULT_SELECTOR, Some(&json!({})), DEFAULT_BRANCH).unwrap(),
            json!("apache2")
        );
        assert_eq!(
            filter_by(&s, &table, DEFAULT_SELECTOR, Some(&json!(null)), DEFAULT_BRANCH).unwrap(),
            json!("apache2")
        );
    }

    #[test]
    fn table_must_be_mapping() {
        let s = store_with(None);
        assert!(matches!(
            filter_by(&s, &json!("nope"), DEFAULT_SELECTOR, None, DEFAULT_BRANCH),
            Err(GrainsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn lookup_does_not_mutate_table_input() {
        let s = store_with(Some(json!("Debian")));
        let table = json!({"Debian": {"pkg": "apache2"}});
        let merge = json!({"srv": "apache2"});
        filter_by(&s, &table, DEFAULT_SELECTOR, Some(&merge), DEFAULT_BRANCH).unwrap();
        assert_eq!(table, json!({"Debian": {"pkg": "apache2"}}));
    }
}
