use std::io;
use thiserror::Error;

/// Errors returned by cache operations.
///
/// Argument and state errors are raised synchronously and never touch the
/// filesystem; I/O errors wrap whatever the underlying filesystem call
/// failed with.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A caller-supplied argument (other than a key) was invalid, e.g. a
    /// `value_count`/`max_size` of zero reaching `open` outside of
    /// [`config::CacheConfig::new`]'s own validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `key` was empty or contained a space, CR, or LF.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// The cache has been closed; no further operations are permitted.
    #[error("cache is closed")]
    Closed,

    /// A commit violated the first-publish constraint: a brand-new entry's
    /// `commit(success = true)` was called without every slot's dirty file
    /// present. This is a programming error, not a transient failure.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A method was called on an [`Editor`](crate::editor::Editor) after its
    /// `commit` or `abort` had already run.
    #[error("editor already closed")]
    EditorClosed,

    /// The directory is already locked by another open cache.
    #[error("cache directory is locked by another process")]
    DirectoryLocked,

    /// An underlying filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<journal::JournalError> for CacheError {
    fn from(e: journal::JournalError) -> Self {
        match e {
            journal::JournalError::Io(io_err) => CacheError::Io(io_err),
            journal::JournalError::Corrupt(msg) => {
                CacheError::IllegalState(format!("corrupt journal: {msg}"))
            }
        }
    }
}

impl From<fsutil::DirLockError> for CacheError {
    fn from(e: fsutil::DirLockError) -> Self {
        match e {
            fsutil::DirLockError::AlreadyLocked => CacheError::DirectoryLocked,
            fsutil::DirLockError::Io(io_err) => CacheError::Io(io_err),
        }
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() || key.contains([' ', '\r', '\n']) {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
