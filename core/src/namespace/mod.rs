//! Grain namespace: the read side of the attribute store.
//!
//! Provides delimiter-based nested-path addressing (e.g. `pkg:apache`), the
//! live in-memory store backed by `serde_json::Value`, and display-only
//! redaction of identifying grains.

pub mod path;
pub mod sanitize;
pub mod store;

pub use path::{traverse, GrainPath};
pub use sanitize::sanitize;
pub use store::GrainStore;
