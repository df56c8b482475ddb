//! # Config — validated construction parameters
//!
//! [`CacheConfig`] is the only way to obtain the arguments `Cache::open` (in
//! the `cache` crate) needs. Validation happens here, synchronously, before
//! any filesystem access — a non-positive `value_count` or `max_size` is an
//! argument error the caller should see immediately rather than after a
//! failed directory scan.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while building a [`CacheConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `value_count` was zero. The cache needs at least one slot per entry.
    #[error("value_count must be > 0")]
    InvalidValueCount,

    /// `max_size` was zero. A zero-byte budget can never hold an entry.
    #[error("max_size must be > 0")]
    InvalidMaxSize,
}

/// Validated construction parameters for a cache directory.
///
/// # Fields
///
/// * `directory` — exclusive to this cache; no other process or cache instance
///   should touch it concurrently (see the directory lock in `fsutil`).
/// * `app_version` — embedded in the journal header. A mismatch against a
///   previously-persisted header is treated as corruption (full wipe), not a
///   migration trigger.
/// * `value_count` — immutable number of slots per entry (`N`).
/// * `max_size` — soft byte budget for the sum of all entries' slot lengths;
///   the trimmer evicts LRU entries to converge on this, but transient
///   overshoot is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub directory: PathBuf,
    pub app_version: i32,
    pub value_count: usize,
    pub max_size: u64,
}

impl CacheConfig {
    /// Starts building a config for `directory`, `app_version`, `value_count`
    /// value slots, and a `max_size` byte budget.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValueCount`] if `value_count == 0`, or
    /// [`ConfigError::InvalidMaxSize`] if `max_size == 0`.
    pub fn new<P: AsRef<Path>>(
        directory: P,
        app_version: i32,
        value_count: usize,
        max_size: u64,
    ) -> Result<Self, ConfigError> {
        if value_count == 0 {
            return Err(ConfigError::InvalidValueCount);
        }
        if max_size == 0 {
            return Err(ConfigError::InvalidMaxSize);
        }
        Ok(Self {
            directory: directory.as_ref().to_path_buf(),
            app_version,
            value_count,
            max_size,
        })
    }
}
