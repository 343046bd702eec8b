//! grains: command-line entry point for the node-local attribute store.
//!
//! # Usage
//!
//! ```text
//! grains get os
//! grains setval roles "[web, db]"
//! grains append roles cache
//! grains filter_by "{Debian: apache2, RedHat: httpd}"
//! grains --out json items sanitize=true
//! ```

use std::path::{Path, PathBuf};
use std::process;

use grains_core::cli::parse_args;
use grains_core::command::Command;
use grains_core::response::Response;
use grains_core::sys::Grains;
use tracing_subscriber::EnvFilter;


fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let cmd = match parse_args(&arg_refs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("grains: {}", e);
            process::exit(1);
        }
    };

    let config_dir = resolve_config_dir();
    tracing::debug!(config_dir = %config_dir.display(), command = cmd.name(), "starting");

    match execute_local(&config_dir, cmd) {
        Response::Ok { output } => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Response::Error { message } => {
            eprintln!("grains error: {}", message);
            process::exit(1);
        }
    }
}


/// Log to stderr, filtered by `GRAINS_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("GRAINS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}


fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GRAINS_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("grains")
}


fn execute_local(config_dir: &Path, cmd: Command) -> Response {
    match Grains::new(config_dir) {
        Ok(mut grains) => grains.execute(cmd),
        Err(e) => Response::Error {
            message: format!("Failed to initialize: {}", e),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn resolve_config_dir_env_and_default() {
        let old = std::env::var("GRAINS_CONFIG_DIR").ok();

        std::env::set_var("GRAINS_CONFIG_DIR", "/tmp/test-grains-config");
        assert_eq!(resolve_config_dir(), PathBuf::from("/tmp/test-grains-config"));

        std::env::remove_var("GRAINS_CONFIG_DIR");
        assert!(resolve_config_dir().to_string_lossy().contains(".config/grains"));

        if let Some(v) = old {
            std::env::set_var("GRAINS_CONFIG_DIR", v);
        }
    }

    #[test]
    fn execute_local_persists_across_runs() {
        let dir = TempDir::new().unwrap();
        let cmd = parse_args(&["setval", "roles", "[web]"]).unwrap();
        assert!(execute_local(dir.path(), cmd).is_ok());

        let cmd = parse_args(&["--out", "json", "get", "roles"]).unwrap();
        match execute_local(dir.path(), cmd) {
            Response::Ok { output } => {
                let v: serde_json::Value = serde_json::from_str(&output).unwrap();
                assert_eq!(v, json!(["web"]));
            }
            Response::Error { message } => panic!("Unexpected error: {}", message),
        }
    }

    #[test]
    fn execute_local_bad_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("minion"), "lock_timeout_ms: [\n").unwrap();
        let resp = execute_local(dir.path(), Command::Ls { out: None });
        match resp {
            Response::Error { message } => assert!(message.starts_with("Failed to initialize")),
            Response::Ok { .. } => panic!("expected error"),
        }
    }
}
