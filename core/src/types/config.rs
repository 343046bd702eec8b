use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GrainsError, Result};

/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "minion";

/// Name of the override file written next to the agent config.
pub const OVERLAY_FILE: &str = "grains";

/// Name of the refresh-signal file inside the cache directory.
pub const REFRESH_FILE: &str = "module_refresh";

pub const DEFAULT_DELIMITER: &str = ":";
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;


#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Outputter {
    #[default]
    Yaml,
    Json,
}

impl Outputter {
    pub fn parse(s: &str) -> Option<Outputter> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "grains" => Some(Outputter::Yaml),
            "json" => Some(Outputter::Json),
            _ => None,
        }
    }
}


/// Resolved runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Agent config file (or directory). The override file lives beside it.
    pub conf_file: PathBuf,
    /// Cache directory holding the refresh-signal file.
    pub cachedir: PathBuf,
    /// Path delimiter for nested grain keys.
    pub delimiter: String,
    /// Upper bound on waiting for the override-file lock.
    pub lock_timeout_ms: u64,
    pub outputter: Outputter,
}

/// On-disk shape: every field optional, filled from defaults.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    conf_file: Option<PathBuf>,
    #[serde(default)]
    cachedir: Option<PathBuf>,
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    lock_timeout_ms: Option<u64>,
    #[serde(default)]
    outputter: Option<Outputter>,
}


impl Settings {
    /// Defaults rooted at `config_dir`.
    pub fn defaults(config_dir: &Path) -> Settings {
        Settings {
            conf_file: config_dir.join(SETTINGS_FILE),
            cachedir: config_dir.join("cache"),
            delimiter: DEFAULT_DELIMITER.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            outputter: Outputter::Yaml,
        }
    }

    /// Load settings from `config_dir/minion`. A missing file yields the
    /// defaults; a malformed one is an error.
    pub fn load(config_dir: &Path) -> Result<Settings> {
        let path = config_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Settings::defaults(config_dir));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GrainsError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Settings::parse(config_dir, &content)
            .map_err(|e| GrainsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse settings YAML, filling unset fields from the defaults for
    /// `config_dir`. An empty document is all defaults.
    pub fn parse(config_dir: &Path, content: &str) -> std::result::Result<Settings, String> {
        let raw: SettingsFile = if content.trim().is_empty() {
            SettingsFile::default()
        } else {
            serde_yaml::from_str::<Option<SettingsFile>>(content)
                .map_err(|e| format!("invalid settings: {}", e))?
                .unwrap_or_default()
        };

        let mut s = Settings::defaults(config_dir);
        if let Some(p) = raw.conf_file {
            s.conf_file = p;
        }
        if let Some(p) = raw.cachedir {
            s.cachedir = p;
        }
        if let Some(d) = raw.delimiter {
            if d.is_empty() {
                return Err("delimiter must not be empty".into());
            }
            s.delimiter = d;
        }
        if let Some(t) = raw.lock_timeout_ms {
            s.lock_timeout_ms = t;
        }
        if let Some(o) = raw.outputter {
            s.outputter = o;
        }
        Ok(s)
    }

    /// Location of the override file, derived from `conf_file`.
    ///
    /// An existing directory holds the file directly; an existing file, or
    /// a path that does not exist yet, holds it in its parent directory.
    pub fn overlay_path(&self) -> PathBuf {
        if self.conf_file.is_dir() {
            self.conf_file.join(OVERLAY_FILE)
        } else {
            self.conf_file
                .parent()
                .map(|p| p.join(OVERLAY_FILE))
                .unwrap_or_else(|| PathBuf::from(OVERLAY_FILE))
        }
    }

    /// Location of the refresh-signal file.
    pub fn refresh_path(&self) -> PathBuf {
        self.cachedir.join(REFRESH_FILE)
    }
}
