//! Store seeding.
//!
//! Fact detection itself lives outside this crate; a `FactSource` hands
//! over the base mapping. At startup the override file is layered on top,
//! so values persisted by an earlier run win over freshly detected ones.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GrainsError, Result};
use crate::namespace::GrainStore;
use crate::persist::overlay::{is_blank_yaml, read_overlay};
use crate::types::config::Settings;
use crate::types::value::{from_yaml, GrainMap};

/// File of static facts inside the config directory.
pub const FACTS_FILE: &str = "facts.yaml";


/// Producer of the base grain mapping.
pub trait FactSource {
    fn collect(&self) -> Result<GrainMap>;
}


/// Facts read from a YAML mapping on disk. A missing file yields nothing.
#[derive(Debug, Clone)]
pub struct StaticFacts {
    path: PathBuf,
}

impl StaticFacts {
    pub fn new(path: &Path) -> Self {
        StaticFacts { path: path.to_path_buf() }
    }

    /// `<config_dir>/facts.yaml`.
    pub fn in_config_dir(config_dir: &Path) -> Self {
        StaticFacts::new(&config_dir.join(FACTS_FILE))
    }
}

impl FactSource for StaticFacts {
    fn collect(&self) -> Result<GrainMap> {
        if !self.path.is_file() {
            return Ok(GrainMap::new());
        }
        let read_err = |reason: String| GrainsError::PersistenceReadError {
            path: self.path.clone(),
            reason,
        };
        let content = std::fs::read_to_string(&self.path).map_err(|e| read_err(e.to_string()))?;
        if is_blank_yaml(&content) {
            return Ok(GrainMap::new());
        }
        let doc: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| read_err(e.to_string()))?;
        match from_yaml(doc).map_err(read_err)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(GrainMap::new()),
            _ => Err(read_err("facts file must hold a mapping".into())),
        }
    }
}


/// Facts supplied directly, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MapFacts(pub GrainMap);

impl FactSource for MapFacts {
    fn collect(&self) -> Result<GrainMap> {
        Ok(self.0.clone())
    }
}


/// Another source with the override file layered on top, key by key.
///
/// An unreadable override file is logged and skipped so the agent still
/// starts with its detected facts; the next write reports the problem.
pub struct OverlayFacts<'a> {
    base: &'a dyn FactSource,
    overlay_path: PathBuf,
}

impl<'a> OverlayFacts<'a> {
    pub fn new(base: &'a dyn FactSource, overlay_path: &Path) -> Self {
        OverlayFacts { base, overlay_path: overlay_path.to_path_buf() }
    }
}

impl FactSource for OverlayFacts<'_> {
    fn collect(&self) -> Result<GrainMap> {
        let mut grains = self.base.collect()?;
        debug!(count = grains.len(), "collected base facts");

        match read_overlay(&self.overlay_path) {
            Ok(overrides) => {
                debug!(count = overrides.len(), "applying grain overrides");
                for (k, v) in overrides {
                    grains.insert(k, v);
                }
            }
            Err(e) => warn!("skipping grain overrides: {}", e),
        }
        Ok(grains)
    }
}


/// Build the live store: `source`, then the override file on top.
pub fn seed_store(source: &dyn FactSource, settings: &Settings) -> Result<GrainStore> {
    let grains = OverlayFacts::new(source, &settings.overlay_path()).collect()?;
    Ok(GrainStore::from_map(grains).with_delimiter(&settings.delimiter))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn map(v: Value) -> GrainMap {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn static_facts_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(StaticFacts::in_config_dir(dir.path()).collect().unwrap().is_empty());
    }

    #[test]
    fn static_facts_reads_mapping() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FACTS_FILE), "os: Debian\nnum_cpus: 4\n").unwrap();
        let facts = StaticFacts::in_config_dir(dir.path()).collect().unwrap();
        assert_eq!(facts.get("os"), Some(&json!("Debian")));
        assert_eq!(facts.get("num_cpus"), Some(&json!(4)));
    }

    #[test]
    fn static_facts_rejects_list() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FACTS_FILE), "- a\n").unwrap();
        assert!(matches!(
            StaticFacts::in_config_dir(dir.path()).collect(),
            Err(GrainsError::PersistenceReadError { .. })
        ));
    }

    #[test]
    fn overrides_win_over_base_facts() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::defaults(dir.path());
        std::fs::write(dir.path().join("grains"), "os: Custom\nroles:\n- web\n").unwrap();
        let base = MapFacts(map(json!({"os": "Debian", "host": "web1"})));
        let store = seed_store(&base, &settings).unwrap();
        assert_eq!(store.lookup("os"), Some(&json!("Custom")));
        assert_eq!(store.lookup("host"), Some(&json!("web1")));
        assert_eq!(store.get("roles:0", json!(null)), json!("web"));
    }

    #[test]
    fn broken_override_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::defaults(dir.path());
        std::fs::write(dir.path().join("grains"), "os: [broken\n").unwrap();
        let base = MapFacts(map(json!({"os": "Debian"})));
        let store = seed_store(&base, &settings).unwrap();
        assert_eq!(store.lookup("os"), Some(&json!("Debian")));
    }

    #[test]
    fn store_uses_configured_delimiter() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::defaults(dir.path());
        settings.delimiter = ".".into();
        let base = MapFacts(map(json!({"pkg": {"apache": "httpd"}})));
        let store = seed_store(&base, &settings).unwrap();
        assert_eq!(store.delimiter(), ".");
        assert_eq!(store.get("pkg.apache", json!(null)), json!("httpd"));
    }
}
