use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{GrainsError, Result};
use crate::facts::{seed_store, StaticFacts};
use crate::namespace::GrainStore;
use crate::ops::{self, hash, lookup};
use crate::persist::{PersistentOverlay, Resync};
use crate::response::Response;
use crate::types::config::{Outputter, Settings};
use crate::types::value::GrainMap;


/// Grains runtime. Owns the live store and the override file and dispatches
/// commands against them.
///
/// Reads borrow the store; every write goes through `&mut self`, so writers
/// inside one process are serialized before they reach the file lock.
pub struct Grains {
    settings: Settings,
    store: GrainStore,
    overlay: PersistentOverlay,
}


impl Grains {
    /// Load settings from `config_dir`, seed the store from
    /// `<config_dir>/facts.yaml`, and layer the override file on top.
    pub fn new(config_dir: &Path) -> Result<Grains> {
        let settings = Settings::load(config_dir)?;
        let store = seed_store(&StaticFacts::in_config_dir(config_dir), &settings)?;
        Ok(Grains::from_parts(settings, store))
    }

    /// Build from an already-seeded store. Useful for embedding and tests.
    pub fn from_parts(settings: Settings, store: GrainStore) -> Grains {
        let overlay = PersistentOverlay::new(&settings);
        let store = store.with_delimiter(&settings.delimiter);
        Grains { settings, store, overlay }
    }

    /// Replace the hook called after each persisted write.
    pub fn with_resync(self, resync: Box<dyn Resync>) -> Grains {
        Grains {
            overlay: self.overlay.with_resync(resync),
            ..self
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &GrainStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Typed operations
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &str, default: Value) -> Value {
        self.store.get(key, default)
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.store.has_value(key)
    }

    pub fn items(&self, sanitize: bool) -> GrainMap {
        self.store.items(sanitize)
    }

    pub fn item<S: AsRef<str>>(&self, keys: &[S], sanitize: bool) -> GrainMap {
        self.store.item(keys, sanitize)
    }

    pub fn ls(&self) -> Vec<String> {
        self.store.ls()
    }

    pub fn setvals(&mut self, grains: &Value, destructive: bool) -> Result<GrainMap> {
        self.overlay.set_values(&mut self.store, grains, destructive)
    }

    /// Set one grain. A delimited key is written inside its top-level grain.
    pub fn setval(&mut self, key: &str, val: Value, destructive: bool) -> Result<GrainMap> {
        ops::persist_at(&mut self.store, &self.overlay, key, val.clone(), destructive)?;
        let mut written = GrainMap::new();
        written.insert(key.to_string(), val);
        Ok(written)
    }

    pub fn delval(&mut self, key: &str, destructive: bool) -> Result<GrainMap> {
        self.setval(key, Value::Null, destructive)
    }

    pub fn append(&mut self, key: &str, val: Value, convert: bool) -> Result<GrainMap> {
        ops::append(&mut self.store, &self.overlay, key, val, convert)
    }

    pub fn remove(&mut self, key: &str, val: &Value) -> Result<GrainMap> {
        ops::remove(&mut self.store, &self.overlay, key, val)
    }

    pub fn filter_by(
        &self,
        lookup_dict: &Value,
        grain: &str,
        merge: Option<&Value>,
        default: &str,
    ) -> Result<Value> {
        ops::filter_by(&self.store, lookup_dict, grain, merge, default)
    }

    pub fn get_or_set_hash(&mut self, name: &str, length: usize, chars: &str) -> Result<Value> {
        ops::get_or_set_hash(&mut self.store, &self.overlay, name, length, chars)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Execute one command, rendering its result for display.
    pub fn execute(&mut self, cmd: Command) -> Response {
        let name = cmd.name();
        debug!(command = name, "executing");
        match self.dispatch(cmd) {
            Ok(output) => Response::Ok { output },
            Err(e) => {
                if e.is_soft() {
                    debug!(command = name, "{}", e);
                } else {
                    warn!(command = name, "{}", e);
                }
                Response::Error { message: e.to_string() }
            }
        }
    }

    fn dispatch(&mut self, cmd: Command) -> Result<String> {
        match cmd {
            Command::Get { key, default, delimiter, out } => {
                let default = default.unwrap_or_else(|| Value::String(String::new()));
                let value = match delimiter {
                    Some(d) => self.store.get_with_delimiter(&key, default, &d),
                    None => self.store.get(&key, default),
                };
                self.render(&value, out)
            }
            Command::HasValue { key } => Ok(self.has_value(&key).to_string()),
            Command::Items { sanitize, out } => {
                self.render(&Value::Object(self.items(sanitize)), out)
            }
            Command::Item { keys, sanitize, out } => {
                self.render(&Value::Object(self.item(keys.as_slice(), sanitize)), out)
            }
            Command::Ls { out } => {
                let names = self.ls().into_iter().map(Value::String).collect();
                self.render(&Value::Array(names), out)
            }
            Command::Setvals { grains, destructive, out } => {
                let written = self.setvals(&grains, destructive)?;
                self.render(&Value::Object(written), out)
            }
            Command::Setval { key, val, destructive, out } => {
                let written = self.setval(&key, val, destructive)?;
                self.render(&Value::Object(written), out)
            }
            Command::Delval { key, destructive, out } => {
                let written = self.delval(&key, destructive)?;
                self.render(&Value::Object(written), out)
            }
            Command::Append { key, val, convert, out } => {
                let written = self.append(&key, val, convert)?;
                self.render(&Value::Object(written), out)
            }
            Command::Remove { key, val, out } => {
                let written = self.remove(&key, &val)?;
                self.render(&Value::Object(written), out)
            }
            Command::FilterBy { lookup_dict, grain, merge, default, out } => {
                let branch = self.filter_by(
                    &lookup_dict,
                    grain.as_deref().unwrap_or(lookup::DEFAULT_SELECTOR),
                    merge.as_ref(),
                    default.as_deref().unwrap_or(lookup::DEFAULT_BRANCH),
                )?;
                self.render(&branch, out)
            }
            Command::GetOrSetHash { name, length, chars, out } => {
                let value = self.get_or_set_hash(
                    &name,
                    length.unwrap_or(hash::DEFAULT_LENGTH),
                    chars.as_deref().unwrap_or(hash::DEFAULT_CHARS),
                )?;
                self.render(&value, out)
            }
            Command::Help { topic } => Ok(crate::help::help_text(topic.as_deref())),
        }
    }

    /// Serialize `value` with the per-call outputter, or the configured one.
    fn render(&self, value: &Value, out: Option<Outputter>) -> Result<String> {
        render_value(value, out.unwrap_or(self.settings.outputter))
    }
}


/// YAML (block style) or pretty JSON, without a trailing newline.
pub fn render_value(value: &Value, outputter: Outputter) -> Result<String> {
    let text = match outputter {
        Outputter::Yaml => {
            serde_yaml::to_string(value).map_err(|e| GrainsError::Render(e.to_string()))?
        }
        Outputter::Json => {
            serde_json::to_string_pretty(value).map_err(|e| GrainsError::Render(e.to_string()))?
        }
    };
    Ok(text.trim_end_matches('\n').to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::RecordingResync;
    use serde_json::json;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn test_grains() -> (TempDir, Grains) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("facts.yaml"),
            "os: Ubuntu\nos_family: Debian\nhost: web1\nserialnumber: ABCDEFGHIJ\n",
        )
        .unwrap();
        let grains = Grains::new(dir.path()).unwrap();
        (dir, grains)
    }

    fn is_ok(r: &Response) -> bool {
        matches!(r, Response::Ok { .. })
    }

    fn output(r: &Response) -> &str {
        match r {
            Response::Ok { output } => output,
            Response::Error { message } => message,
        }
    }

    // --- reads ---

    #[test]
    fn get_scalar() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Get { key: "os".into(), default: None, delimiter: None, out: None });
        assert!(is_ok(&r));
        assert_eq!(output(&r), "Ubuntu");
    }

    #[test]
    fn get_missing_uses_empty_default() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Get {
            key: "nope".into(),
            default: None,
            delimiter: None,
            out: Some(Outputter::Json),
        });
        assert_eq!(output(&r), "\"\"");
    }

    #[test]
    fn get_with_call_delimiter() {
        let (_dir, mut g) = test_grains();
        g.setval("pkg", json!({"apache": "apache2"}), false).unwrap();
        let r = g.execute(Command::Get {
            key: "pkg.apache".into(),
            default: None,
            delimiter: Some(".".into()),
            out: None,
        });
        assert_eq!(output(&r), "apache2");
    }

    #[test]
    fn has_value_prints_bool() {
        let (_dir, mut g) = test_grains();
        assert_eq!(output(&g.execute(Command::HasValue { key: "os".into() })), "true");
        assert_eq!(output(&g.execute(Command::HasValue { key: "gpu".into() })), "false");
    }

    #[test]
    fn items_sanitized() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Items { sanitize: true, out: Some(Outputter::Json) });
        let v: Value = serde_json::from_str(output(&r)).unwrap();
        assert_eq!(v["host"], "MINION");
        assert_eq!(v["serialnumber"], "ABCDEFGXXX");
        assert_eq!(v["os"], "Ubuntu");
        assert_eq!(g.get("host", json!(null)), json!("web1"));
    }

    #[test]
    fn ls_sorted_yaml_list() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Ls { out: None });
        assert_eq!(output(&r), "- host\n- os\n- os_family\n- serialnumber");
    }

    #[test]
    fn item_skips_missing() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Item {
            keys: vec!["os".into(), "gpu".into()],
            sanitize: false,
            out: None,
        });
        assert_eq!(output(&r), "os: Ubuntu");
    }

    // --- writes ---

    #[test]
    fn setval_then_get() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Setval {
            key: "roles".into(),
            val: json!(["web", "db"]),
            destructive: false,
            out: Some(Outputter::Json),
        });
        assert!(is_ok(&r));
        assert_eq!(g.get("roles:1", json!(null)), json!("db"));
    }

    #[test]
    fn setvals_rejects_non_mapping() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Setvals { grains: json!(["x"]), destructive: false, out: None });
        assert!(!is_ok(&r));
        assert_eq!(output(&r), "setvals grains must be a dictionary.");
    }

    #[test]
    fn delval_destructive_removes() {
        let (_dir, mut g) = test_grains();
        g.setval("role", json!("web"), false).unwrap();
        let r = g.execute(Command::Delval { key: "role".into(), destructive: true, out: None });
        assert!(is_ok(&r));
        assert!(!g.ls().contains(&"role".to_string()));
    }

    #[test]
    fn nested_setval_round_trips() {
        let (dir, mut g) = test_grains();
        let ret = g.setval("pkg:apache", json!("httpd"), false).unwrap();
        assert_eq!(ret.get("pkg:apache"), Some(&json!("httpd")));
        assert_eq!(g.get("pkg:apache", json!(null)), json!("httpd"));
        assert!(!g.ls().contains(&"pkg:apache".to_string()));

        let again = Grains::new(dir.path()).unwrap();
        assert_eq!(again.get("pkg:apache", json!(null)), json!("httpd"));
    }

    #[test]
    fn nested_setval_through_scalar_is_rejected() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Setval {
            key: "os:tags".into(),
            val: json!(["x"]),
            destructive: false,
            out: None,
        });
        assert!(!is_ok(&r));
        assert!(output(&r).contains("os:tags"));
        assert_eq!(g.get("os", json!(null)), json!("Ubuntu"));
    }

    #[test]
    fn nested_delval() {
        let (_dir, mut g) = test_grains();
        g.setval("pkg", json!({"apache": "httpd", "nginx": "nginx"}), false).unwrap();
        g.delval("pkg:nginx", false).unwrap();
        assert_eq!(g.get("pkg", json!(null)), json!({"apache": "httpd", "nginx": null}));
        g.delval("pkg:nginx", true).unwrap();
        assert_eq!(g.get("pkg", json!(null)), json!({"apache": "httpd"}));
    }

    #[test]
    fn append_twice_reports_error() {
        let (_dir, mut g) = test_grains();
        let cmd = Command::Append { key: "roles".into(), val: json!("web"), convert: false, out: None };
        assert!(is_ok(&g.execute(cmd.clone())));
        let r = g.execute(cmd);
        assert_eq!(output(&r), "The val web was already in the list roles");
    }

    #[test]
    fn remove_missing_reports_error() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Remove { key: "roles".into(), val: json!("web"), out: None });
        assert!(!is_ok(&r));
        assert!(output(&r).contains("was not in the list roles"));
    }

    #[test]
    fn writes_call_resync() {
        let (_dir, g) = test_grains();
        let hook = Rc::new(RecordingResync::new());
        let mut g = g.with_resync(Box::new(hook.clone()));
        g.setval("a", json!(1), false).unwrap();
        g.append("b", json!(2), false).unwrap();
        assert_eq!(hook.calls(), 2);
    }

    // --- lookup / provisioning ---

    #[test]
    fn filter_by_defaults_to_os_family() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::FilterBy {
            lookup_dict: json!({"Debian": {"pkg": "apache2"}, "RedHat": {"pkg": "httpd"}}),
            grain: None,
            merge: None,
            default: None,
            out: None,
        });
        assert_eq!(output(&r), "pkg: apache2");
    }

    #[test]
    fn get_or_set_hash_is_stable() {
        let (_dir, mut g) = test_grains();
        let cmd = Command::GetOrSetHash { name: "secret".into(), length: Some(20), chars: None, out: None };
        let first = output(&g.execute(cmd.clone())).to_string();
        let second = output(&g.execute(cmd)).to_string();
        assert_eq!(first, second);
        assert_eq!(g.get("secret", json!(null)).as_str().map(|s| s.chars().count()), Some(20));
    }

    #[test]
    fn help_returns_text() {
        let (_dir, mut g) = test_grains();
        let r = g.execute(Command::Help { topic: Some("append".into()) });
        assert!(output(&r).starts_with("grains append"));
    }

    // --- startup ---

    #[test]
    fn fresh_runtime_sees_persisted_overrides() {
        let (dir, mut g) = test_grains();
        g.setval("os", json!("Custom"), false).unwrap();
        let again = Grains::new(dir.path()).unwrap();
        assert_eq!(again.get("os", json!(null)), json!("Custom"));
        assert_eq!(again.get("host", json!(null)), json!("web1"));
    }

    #[test]
    fn malformed_settings_fail_startup() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("minion"), "delimiter: [oops\n").unwrap();
        assert!(matches!(Grains::new(dir.path()), Err(GrainsError::Config(_))));
    }

    #[test]
    fn configured_outputter_is_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("minion"), "outputter: json\n").unwrap();
        let mut g = Grains::new(dir.path()).unwrap();
        g.setval("n", json!(1), false).unwrap();
        let r = g.execute(Command::Get { key: "n".into(), default: None, delimiter: None, out: None });
        assert_eq!(output(&r), "1");
        let r = g.execute(Command::Item { keys: vec!["n".into()], sanitize: false, out: None });
        assert_eq!(output(&r), "{\n  \"n\": 1\n}");
    }

    #[test]
    fn render_yaml_is_block_style() {
        let text = render_value(&json!({"roles": ["web", "db"]}), Outputter::Yaml).unwrap();
        assert_eq!(text, "roles:\n- web\n- db");
    }
}
