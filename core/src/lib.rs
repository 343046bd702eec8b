//! Grains: a node-local attribute store.
//!
//! Facts about the node live in a [`GrainStore`] addressed by delimited
//! paths (`pkg:apache`, `ip_interfaces:eth0:0`). Operator overrides are
//! merged into the store and persisted to a YAML override file by
//! [`PersistentOverlay`]. [`Grains`] ties the two together and executes
//! typed [`Command`]s.

pub mod cli;
pub mod command;
pub mod error;
pub mod facts;
pub mod help;
pub mod namespace;
pub mod ops;
pub mod persist;
pub mod response;
pub mod sys;
pub mod types;

pub use command::Command;
pub use error::{GrainsError, Result};
pub use namespace::GrainStore;
pub use persist::PersistentOverlay;
pub use response::Response;
pub use sys::Grains;
pub use types::{GrainMap, GrainValue, Outputter, Settings};
