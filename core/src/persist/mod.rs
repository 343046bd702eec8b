//! Write side of the grain store: the override file, its lock, and the
//! notifications sent after each write.

pub mod lock;
pub mod overlay;
pub mod refresh;

pub use overlay::PersistentOverlay;
pub use refresh::{NoopResync, RecordingResync, Resync};
