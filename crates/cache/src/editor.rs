//! Open/commit/abort of a multi-slot edit.
//!
//! An [`Editor`] is bound to exactly one entry for its whole lifetime. It is
//! created with a `DIRTY` record already flushed to the journal (see
//! [`crate::Cache::edit`]) so that a crash between allocating dirty files and
//! journaling that fact is detected on replay as a dangling edit.

use crate::error::CacheError;
use crate::paths::{clean_path, dirty_path};
use crate::Shared;
use journal::JournalRecord;
use std::fs::{self, File};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle through which the caller writes each slot of an in-progress edit
/// and then either [`commit`](Editor::commit)s or [`abort`](Editor::abort)s.
pub struct Editor {
    shared: Arc<Shared>,
    key: String,
    editor_id: u64,
    value_count: usize,
    /// Lengths the entry had before this edit started; restored verbatim if
    /// the edit aborts after having previously published a version.
    prev_lengths: Vec<u64>,
    /// Whether this edit is the entry's first-ever publish.
    created_new: bool,
    has_errors: Arc<AtomicBool>,
    done: bool,
}

/// Wraps a single slot's dirty file. Any write or flush failure is recorded
/// on the owning editor's `has_errors` flag before the error is returned to
/// the caller — the failure is never swallowed, only noted.
pub struct SlotWriter {
    file: File,
    has_errors: Arc<AtomicBool>,
}

impl Write for SlotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf).map_err(|e| {
            self.has_errors.store(true, Ordering::SeqCst);
            e
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush().map_err(|e| {
            self.has_errors.store(true, Ordering::SeqCst);
            e
        })
    }
}

impl Editor {
    pub(crate) fn new(
        shared: Arc<Shared>,
        key: String,
        editor_id: u64,
        value_count: usize,
        prev_lengths: Vec<u64>,
        created_new: bool,
    ) -> Self {
        Self {
            shared,
            key,
            editor_id,
            value_count,
            prev_lengths,
            created_new,
            has_errors: Arc::new(AtomicBool::new(false)),
            done: false,
        }
    }

    /// Opens (creating if needed) the dirty file for slot `index` and
    /// returns a writer over it.
    pub fn new_writer(&self, index: usize) -> Result<SlotWriter, CacheError> {
        if self.done {
            return Err(CacheError::EditorClosed);
        }
        if index >= self.value_count {
            return Err(CacheError::InvalidArgument(format!(
                "slot index {index} out of range (value_count = {})",
                self.value_count
            )));
        }
        let dir = &self.shared.directory;
        let path = dirty_path(dir, &self.key, index);
        let file = File::create(&path).map_err(|e| {
            self.has_errors.store(true, Ordering::SeqCst);
            CacheError::Io(e)
        })?;
        Ok(SlotWriter {
            file,
            has_errors: Arc::clone(&self.has_errors),
        })
    }

    /// Generation id bound to this edit, used by replay to detect a dangling
    /// `DIRTY` with no later `CLEAN`/`REMOVE`.
    pub fn editor_id(&self) -> u64 {
        self.editor_id
    }

    /// Finalizes or discards the edit, depending on whether any writer saw
    /// an I/O error.
    ///
    /// If [`has_errors`](SlotWriter) fired during this edit, this behaves as
    /// an abort followed by an unconditional removal — any previously
    /// published version of `key` is invalidated, since the edit may have
    /// left some slots only partially written. A first-publish commit
    /// missing one of its slots is the same: it is a programming error, but
    /// still cleans up its dirty files and the entry before returning
    /// [`IllegalState`](CacheError::IllegalState), rather than leaving the
    /// entry stuck mid-edit forever. Otherwise every dirty file whose slot
    /// was touched is renamed into place, `lengths` is updated from the new
    /// file sizes, and a `CLEAN` record is appended.
    pub fn commit(&mut self) -> Result<(), CacheError> {
        if self.done {
            return Err(CacheError::EditorClosed);
        }
        self.done = true;

        if self.has_errors.load(Ordering::SeqCst) {
            self.delete_dirty_files()?;
            self.shared.force_remove(&self.key)?;
            return Ok(());
        }

        let dir = self.shared.directory.clone();
        let mut state = self.shared.state.lock().unwrap();
        if state.closed {
            return Err(CacheError::Closed);
        }

        if self.created_new {
            for i in 0..self.value_count {
                if !dirty_path(&dir, &self.key, i).exists() {
                    drop(state);
                    self.delete_dirty_files()?;
                    self.shared.force_remove(&self.key)?;
                    return Err(CacheError::IllegalState(format!(
                        "slot {i} of new entry {:?} was never written before commit",
                        self.key
                    )));
                }
            }
        }

        let mut new_lengths = self.prev_lengths.clone();
        let mut size_delta: i64 = 0;
        for i in 0..self.value_count {
            let dirty = dirty_path(&dir, &self.key, i);
            if dirty.exists() {
                let len = fs::metadata(&dirty)?.len();
                fsutil::atomic_rename(&dirty, &clean_path(&dir, &self.key, i))?;
                size_delta += len as i64 - new_lengths[i] as i64;
                new_lengths[i] = len;
            }
        }

        {
            let entry = state
                .index
                .get_mut(&self.key)
                .expect("entry must exist while its editor is live");
            entry.lengths = new_lengths.clone();
            entry.readable = true;
            entry.current_editor = None;
        }
        state.size = (state.size as i64 + size_delta).max(0) as u64;
        state.append_record(JournalRecord::Clean {
            key: self.key.clone(),
            lengths: new_lengths,
        })?;
        drop(state);

        self.shared.maybe_schedule_trim();
        Ok(())
    }

    /// Discards the edit: deletes any dirty files, then either drops the
    /// entry (if it had never been published) or re-affirms its pre-edit
    /// `CLEAN` record (if it had).
    pub fn abort(&mut self) -> Result<(), CacheError> {
        if self.done {
            return Err(CacheError::EditorClosed);
        }
        self.done = true;
        self.delete_dirty_files()?;

        let mut state = self.shared.state.lock().unwrap();
        if state.closed {
            return Err(CacheError::Closed);
        }

        if self.created_new {
            state.index.remove(&self.key);
            state.append_record(JournalRecord::Remove {
                key: self.key.clone(),
            })?;
        } else {
            if let Some(entry) = state.index.get_mut(&self.key) {
                entry.current_editor = None;
            }
            state.append_record(JournalRecord::Clean {
                key: self.key.clone(),
                lengths: self.prev_lengths.clone(),
            })?;
        }
        Ok(())
    }

    fn delete_dirty_files(&self) -> Result<(), CacheError> {
        let dir = &self.shared.directory;
        for i in 0..self.value_count {
            let path = dirty_path(dir, &self.key, i);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if !self.done {
            // Best-effort: a caller that drops an Editor without calling
            // commit/abort still needs its dirty files cleaned up and the
            // entry's `current_editor` cleared so it doesn't look dangling
            // forever. Errors here can't be propagated from Drop.
            let _ = self.abort();
        }
    }
}
