//! Post-write notifications: the refresh-signal file and the resync hook.
//!
//! Both are fire-and-forget. A failure here is logged by the caller and
//! never rolls back a write.

use std::cell::Cell;
use std::fs::OpenOptions;
use std::path::Path;
use std::rc::Rc;


/// Hook invoked after every write so out-of-process state can converge
/// with the freshly updated store.
pub trait Resync {
    fn resync(&self) -> Result<(), String>;
}

impl<T: Resync + ?Sized> Resync for Rc<T> {
    fn resync(&self) -> Result<(), String> {
        (**self).resync()
    }
}

/// Production default when nothing downstream needs to be told.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResync;

impl Resync for NoopResync {
    fn resync(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Test-double that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingResync {
    calls: Cell<usize>,
    fail: bool,
}

impl RecordingResync {
    pub fn new() -> Self {
        RecordingResync::default()
    }

    pub fn failing() -> Self {
        RecordingResync {
            calls: Cell::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Resync for RecordingResync {
    fn resync(&self) -> Result<(), String> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            Err("resync unavailable".into())
        } else {
            Ok(())
        }
    }
}


/// Create or truncate the refresh-signal file. Only its modification
/// matters; the content is always empty.
pub fn touch_refresh_signal(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create {}: {}", parent.display(), e))?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| format!("cannot write {}: {}", path.display(), e))
}
