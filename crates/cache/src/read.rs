//! `get()` (read a published [`Snapshot`]) and `edit()` (begin a new
//! [`Editor`]).

use crate::error::{validate_key, CacheError};
use crate::paths::clean_path;
use crate::snapshot::Snapshot;
use crate::{Cache, Editor};
use index::Entry;
use journal::JournalRecord;
use std::fs::File;
use std::io;
use std::sync::Arc;
use tracing::debug;

impl Cache {
    /// Returns a [`Snapshot`] over `key`'s currently published version, or
    /// `None` if `key` has never been committed, was removed, or its clean
    /// files were found missing on disk.
    pub fn get(&self, key: &str) -> Result<Option<Snapshot>, CacheError> {
        validate_key(key)?;
        let value_count = self.shared.value_count;
        let dir = self.shared.directory.clone();

        let mut state = self.shared.state.lock().unwrap();
        if state.closed {
            return Err(CacheError::Closed);
        }

        // `get` bumps recency on any lookup that finds the key, readable or
        // not — mirroring the access-ordered map's own semantics.
        let readable = matches!(state.index.get(key), Some(entry) if entry.readable);
        if !readable {
            return Ok(None);
        }

        let mut files = Vec::with_capacity(value_count);
        for i in 0..value_count {
            match File::open(clean_path(&dir, key, i)) {
                Ok(f) => files.push(f),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // The index says this entry is readable but a clean
                    // file is missing on disk — something external touched
                    // the directory. Treat the entry as absent rather than
                    // handing back a partial snapshot.
                    return Ok(None);
                }
                Err(e) => return Err(CacheError::Io(e)),
            }
        }

        state.append_record(JournalRecord::Read {
            key: key.to_string(),
        })?;
        let should_trim =
            Cache::journal_rebuild_required(state.redundant_op_count, state.index.len());
        drop(state);

        if should_trim {
            self.shared.maybe_schedule_trim();
        }

        debug!(key, "cache get hit");
        Ok(Some(Snapshot::new(files)))
    }

    /// Begins an edit on `key`, or returns `None` if another edit on the
    /// same key is already in progress.
    ///
    /// Appends and flushes a `DIRTY` record before returning, so that a
    /// crash between allocating dirty files and journaling that fact is
    /// detected on replay: a `DIRTY` with no later `CLEAN`/`REMOVE` is
    /// dangling and gets cleaned up by `process_journal` on the next open.
    pub fn edit(&self, key: &str) -> Result<Option<Editor>, CacheError> {
        validate_key(key)?;
        let value_count = self.shared.value_count;

        let mut state = self.shared.state.lock().unwrap();
        if state.closed {
            return Err(CacheError::Closed);
        }

        let (created_new, prev_lengths) = match state.index.get_mut(key) {
            Some(entry) if entry.current_editor.is_some() => return Ok(None),
            Some(entry) => (false, entry.lengths.clone()),
            None => (true, vec![0u64; value_count]),
        };

        let editor_id = state.next_editor_id;
        state.next_editor_id += 1;

        if created_new {
            state.index.put(
                key.to_string(),
                Entry {
                    lengths: prev_lengths.clone(),
                    readable: false,
                    current_editor: Some(editor_id),
                },
            );
        } else if let Some(entry) = state.index.get_mut(key) {
            entry.current_editor = Some(editor_id);
        }

        state.append_record(JournalRecord::Dirty {
            key: key.to_string(),
        })?;
        drop(state);

        debug!(key, editor_id, created_new, "cache edit started");
        Ok(Some(Editor::new(
            Arc::clone(&self.shared),
            key.to_string(),
            editor_id,
            value_count,
            prev_lengths,
            created_new,
        )))
    }
}
