use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Grains errors
// ---------------------------------------------------------------------------

/// Failure modes of grain reads, writes, and lookups.
///
/// Every user-facing operation returns `Result<_, GrainsError>`; the
/// dispatch layer turns these into `Response::Error` so nothing here ever
/// takes the host process down.
#[derive(Debug, Error)]
pub enum GrainsError {
    /// The caller passed the wrong shape of input (e.g. a list where a
    /// mapping is required).
    #[error("{0}")]
    InvalidArgument(String),

    /// A list operation was attempted on a grain that is not a list.
    #[error("The key {key} is not a valid list")]
    TypeMismatch { key: String },

    /// A nested write found a scalar, or a list without the addressed
    /// element, where its path needs a container.
    #[error("The key {key} cannot be set: a value on its path is not a mapping")]
    PathConflict { key: String },

    /// `append` found the value already in the list.
    #[error("The val {val} was already in the list {key}")]
    AlreadyPresent { key: String, val: String },

    /// `remove` did not find the value in the list.
    #[error("The val {val} was not in the list {key}")]
    NotPresent { key: String, val: String },

    /// The override file exists but could not be read or parsed.
    #[error("Unable to read existing grains file {}: {reason}", path.display())]
    PersistenceReadError { path: PathBuf, reason: String },

    /// The override file could not be locked or written.
    #[error("Unable to write to grains file at {}: {reason}", path.display())]
    PersistenceWriteError { path: PathBuf, reason: String },

    /// The settings file is present but malformed.
    #[error("settings error: {0}")]
    Config(String),

    /// A result could not be serialized by the chosen outputter.
    #[error("unable to render output: {0}")]
    Render(String),
}

impl GrainsError {
    /// True for the expected, reportable failures of list membership and
    /// type checks, as opposed to malformed caller input or I/O trouble.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            GrainsError::TypeMismatch { .. }
                | GrainsError::PathConflict { .. }
                | GrainsError::AlreadyPresent { .. }
                | GrainsError::NotPresent { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GrainsError>;
