//! Command: the typed interface for every grain operation.
//!
//! Every operation that can be dispatched through `Grains::execute()` is a
//! variant of the `Command` enum. The enum doubles as a JSON wire format and
//! as the API listing for the core crate.
//!
//! # Wire Format
//!
//! Commands are serialized as JSON objects with a `"command"` discriminant:
//!
//! ```json
//! {"command": "get", "key": "pkg:apache"}
//! {"command": "setval", "key": "roles", "val": ["web"]}
//! {"command": "filter_by", "lookup_dict": {"Debian": "apache2"}}
//! ```
//!
//! # Command Groups
//!
//! | Group | Commands |
//! |-------|----------|
//! | Read | `get`, `has_value`, `items`, `item`, `ls` |
//! | Write | `setvals`, `setval`, `delval` |
//! | List | `append`, `remove` |
//! | Lookup | `filter_by` |
//! | Provision | `get_or_set_hash` |
//! | Help | `help` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::config::Outputter;


/// A typed grain operation.
///
/// Required fields are non-optional; optional fields fall back to the same
/// defaults the library functions use. `out` overrides the configured
/// outputter for a single call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------

    /// Read a value by delimited path.
    #[serde(rename = "get")]
    Get {
        key: String,
        /// Returned when the path does not resolve. Defaults to "".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
        /// Per-call delimiter, overriding the configured one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delimiter: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    /// True when the value at the path is present and truthy.
    #[serde(rename = "has_value")]
    HasValue {
        key: String,
    },

    /// The whole store.
    #[serde(rename = "items")]
    Items {
        #[serde(default)]
        sanitize: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    /// Only the named top-level grains.
    #[serde(rename = "item")]
    Item {
        keys: Vec<String>,
        #[serde(default)]
        sanitize: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    /// Sorted top-level grain names.
    #[serde(rename = "ls")]
    Ls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    // -----------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------

    /// Merge a mapping of grains into the store and the override file.
    #[serde(rename = "setvals")]
    Setvals {
        grains: Value,
        #[serde(default)]
        destructive: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    /// Set one top-level grain.
    #[serde(rename = "setval")]
    Setval {
        key: String,
        val: Value,
        #[serde(default)]
        destructive: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    /// Null a grain, or remove it entirely with `destructive`.
    #[serde(rename = "delval")]
    Delval {
        key: String,
        #[serde(default)]
        destructive: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    // -----------------------------------------------------------------
    // List
    // -----------------------------------------------------------------

    /// Append to a list grain, creating it if missing.
    #[serde(rename = "append")]
    Append {
        key: String,
        val: Value,
        /// Wrap a scalar grain into a list first.
        #[serde(default)]
        convert: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    /// Remove the first occurrence of a value from a list grain.
    #[serde(rename = "remove")]
    Remove {
        key: String,
        val: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    // -----------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------

    /// Pick the branch of a lookup table matching a grain's value.
    #[serde(rename = "filter_by")]
    FilterBy {
        lookup_dict: Value,
        /// Grain to select on. Defaults to `os_family`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grain: Option<String>,
        /// Mapping deep-merged over the selected branch.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        merge: Option<Value>,
        /// Branch used when nothing matches. Defaults to `default`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    // -----------------------------------------------------------------
    // Provision
    // -----------------------------------------------------------------

    /// Return the value at `name`, generating and persisting one if absent.
    #[serde(rename = "get_or_set_hash")]
    GetOrSetHash {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chars: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        out: Option<Outputter>,
    },

    // -----------------------------------------------------------------
    // Help
    // -----------------------------------------------------------------

    /// Show help text. With a topic, shows detailed help for that command.
    #[serde(rename = "help")]
    Help {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },
}


impl Command {
    /// Wire name of the command, as used in the `"command"` field.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::HasValue { .. } => "has_value",
            Command::Items { .. } => "items",
            Command::Item { .. } => "item",
            Command::Ls { .. } => "ls",
            Command::Setvals { .. } => "setvals",
            Command::Setval { .. } => "setval",
            Command::Delval { .. } => "delval",
            Command::Append { .. } => "append",
            Command::Remove { .. } => "remove",
            Command::FilterBy { .. } => "filter_by",
            Command::GetOrSetHash { .. } => "get_or_set_hash",
            Command::Help { .. } => "help",
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
