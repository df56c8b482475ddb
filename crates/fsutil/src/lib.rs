//! # Filesystem primitives
//!
//! Thin helpers the cache core builds on: recursive directory emptying,
//! an atomic-rename wrapper, an advisory directory lock, and a "close and
//! ignore the error" helper for cleanup paths where propagating a close
//! failure would be surprising to the caller.

use std::fs::{self, File};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Deletes every entry inside `dir` without removing `dir` itself.
///
/// Used by the corruption-recovery path (wipe and start fresh) and by
/// `delete` (which removes the directory afterward too).
pub fn remove_dir_contents(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Renames `tmp` to `dest`.
///
/// Documents the atomicity assumption this crate relies on throughout:
/// `tmp` and `dest` live on the same filesystem, typically in the same
/// directory, so the rename is a single atomic metadata operation.
pub fn atomic_rename(tmp: &Path, dest: &Path) -> io::Result<()> {
    fs::rename(tmp, dest)
}

/// Drops `closeable`, discarding any error its `Drop` impl surfaces via a
/// fallible close method called first.
///
/// Most `Drop` impls in this codebase (file handles, buffered writers) don't
/// expose a fallible close at all, in which case this is just `drop(x)`. It
/// exists as a named call site so "we are deliberately ignoring a close
/// failure here" reads the same way everywhere it happens.
pub fn quiet_close<T>(closeable: T) {
    drop(closeable);
}

/// Failure to acquire the advisory directory lock.
#[derive(Debug, Error)]
pub enum DirLockError {
    #[error("directory is already locked by another process")]
    AlreadyLocked,
    #[error("io error acquiring directory lock: {0}")]
    Io(#[from] io::Error),
}

/// An advisory exclusive lock on a cache directory, held via `flock(2)` on a
/// sentinel file for the lifetime of an open `Cache`.
///
/// This is advisory only — it does nothing to stop a process that ignores
/// locking from touching the directory concurrently, which matches this
/// cache's non-goal of cross-process sharing: the lock exists to fail fast
/// with a clear error rather than to enforce safety against a hostile peer.
pub struct DirLock {
    file: File,
    path: PathBuf,
}

impl DirLock {
    /// Acquires the lock on `<dir>/<lock file name>`, creating the sentinel
    /// file if it doesn't exist. Fails immediately (rather than blocking) if
    /// another handle already holds it.
    pub fn acquire(dir: &Path, lock_file_name: &str) -> Result<Self, DirLockError> {
        let path = dir.join(lock_file_name);
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;

        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EWOULDBLOCK) => Err(DirLockError::AlreadyLocked),
                _ => Err(DirLockError::Io(err)),
            };
        }

        Ok(Self { file, path })
    }

    /// Path to the sentinel file backing this lock.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}
