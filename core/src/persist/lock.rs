//! Advisory lock around the override file's read-merge-write cycle.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;


/// Why the overlay lock was not taken.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file could not be created or opened.
    #[error("cannot open lock file {}: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },

    /// Another holder kept the lock past the deadline.
    #[error("timed out acquiring lock {} after {timeout_ms}ms", path.display())]
    Timeout { path: PathBuf, timeout_ms: u64 },
}


/// File-lock guard that releases the lock on drop.
///
/// The lock file itself is left in place: removing it while another process
/// waits on the same path would let two writers hold "the" lock at once.
#[derive(Debug)]
pub struct OverlayLock {
    file: File,
    path: PathBuf,
}

impl OverlayLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OverlayLock {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
        debug!(path = %self.path.display(), "released overlay lock");
    }
}


/// Lock-file path for a given override file: `<overlay>.lock`.
pub fn lock_path_for(overlay: &Path) -> PathBuf {
    let mut name = overlay
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    overlay.with_file_name(name)
}


/// Acquire an exclusive lock, polling until `timeout_ms` elapses.
pub fn acquire(lock_path: &Path, timeout_ms: u64) -> Result<OverlayLock, LockError> {
    let unavailable = |e: std::io::Error| LockError::Unavailable {
        path: lock_path.to_path_buf(),
        reason: e.to_string(),
    };
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(unavailable)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
        .map_err(unavailable)?;

    let fd = file.as_raw_fd();
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let ret = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if ret == 0 {
            debug!(path = %lock_path.display(), "acquired overlay lock");
            return Ok(OverlayLock {
                file,
                path: lock_path.to_path_buf(),
            });
        }

        if Instant::now() >= deadline {
            return Err(LockError::Timeout {
                path: lock_path.to_path_buf(),
                timeout_ms,
            });
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}
