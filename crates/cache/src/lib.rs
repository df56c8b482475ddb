//! # Cache — a bounded, filesystem-backed LRU cache for byte blobs
//!
//! The central orchestrator tying together the [`index`], [`journal`], and
//! [`fsutil`] crates into a complete on-disk LRU cache. Each key maps to a
//! fixed number of value slots; a key becomes readable once every slot of
//! its first edit has committed. The cache survives process restarts by
//! replaying its journal, and keeps its total size near a configured budget
//! via a dedicated background trimmer thread.
//!
//! ## Module responsibilities
//!
//! | Module | Purpose |
//! |---|---|
//! | [`lib.rs`] | `Cache`/`Shared`/`State`, construction, accessors, `Drop` |
//! | [`open`] | Recovery: header validation, journal replay, corruption handling |
//! | [`editor`] | `edit()`, `Editor`, `SlotWriter`, commit/abort |
//! | [`read`] | `get()`, `Snapshot` construction |
//! | [`snapshot`] | `Snapshot`, the read-side handle over a published version |
//! | [`remove`] | `remove()` |
//! | [`trimmer`] | The background worker enforcing the byte budget |
//!
//! ## Locking discipline
//!
//! Every call that mutates cache state acquires [`Shared::state`] for the
//! duration of the mutation, but never while performing the slot read/write
//! I/O itself (see [`Snapshot`] and [`editor::SlotWriter`]) — a `Snapshot`'s
//! readers are opened under the lock, then handed to the caller to read from
//! at their own pace, lock-free.

mod editor;
mod error;
mod open;
mod paths;
mod read;
mod remove;
mod snapshot;
mod trimmer;

pub use config::CacheConfig;
pub use editor::{Editor, SlotWriter};
pub use error::CacheError;
pub use snapshot::Snapshot;

use index::EntryIndex;
use journal::{JournalRecord, JournalWriter};
use std::path::PathBuf;
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Mutable cache state guarded by [`Shared::state`].
struct State {
    index: EntryIndex,
    size: u64,
    redundant_op_count: u64,
    journal: Option<JournalWriter>,
    lock: Option<fsutil::DirLock>,
    closed: bool,
    next_editor_id: u64,
}

impl State {
    /// Appends `record` to the journal and bumps `redundant_op_count` — a
    /// rebuild would collapse every record appended since the last rebuild
    /// down to at most one per live entry.
    fn append_record(&mut self, record: JournalRecord) -> Result<(), CacheError> {
        self.journal
            .as_mut()
            .expect("journal is open while cache is not closed")
            .append(&record)?;
        self.redundant_op_count += 1;
        Ok(())
    }
}

/// Fields shared between `Cache` and the handles (`Editor`, `Snapshot`) it
/// hands out, plus the trimmer thread (which holds its own clone of this
/// `Arc` only transiently, per wakeup — see [`trimmer`]).
struct Shared {
    directory: PathBuf,
    app_version: i32,
    value_count: usize,
    max_size: u64,
    state: Mutex<State>,
    trimmer_tx: Mutex<Option<SyncSender<()>>>,
    trimmer_handle: Mutex<Option<JoinHandle<()>>>,
}

/// A bounded, filesystem-backed LRU cache for opaque byte blobs keyed by
/// string.
///
/// Construct with [`Cache::open`]. Every key maps to `value_count` slots
/// (fixed at open time); [`edit`](Cache::edit) publishes all slots of a key
/// atomically, [`get`](Cache::get) returns a [`Snapshot`] over the most
/// recently published version, and the background trimmer keeps total size
/// near `max_size`.
pub struct Cache {
    shared: Arc<Shared>,
}

impl Cache {
    /// Total byte size of every readable entry's slots.
    pub fn size(&self) -> u64 {
        self.shared.state.lock().unwrap().size
    }

    /// Number of entries currently tracked (readable or mid-edit).
    pub fn len(&self) -> usize {
        self.shared.state.lock().unwrap().index.len()
    }

    /// `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The directory this cache was opened against.
    pub fn directory(&self) -> &std::path::Path {
        &self.shared.directory
    }

    /// `true` once [`close`](Cache::close) or [`delete`](Cache::delete) has
    /// run.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().unwrap().closed
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock().unwrap();
        f.debug_struct("Cache")
            .field("directory", &self.shared.directory)
            .field("app_version", &self.shared.app_version)
            .field("value_count", &self.shared.value_count)
            .field("max_size", &self.shared.max_size)
            .field("size", &state.size)
            .field("entries", &state.index.len())
            .field("redundant_op_count", &state.redundant_op_count)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Best-effort close on drop: a `Cache` dropped without an explicit
/// `close()` still releases its directory lock and stops the trimmer
/// thread rather than leaking either.
impl Drop for Cache {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests;
