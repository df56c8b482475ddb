//! `remove()` — evicting or explicitly deleting one cache entry, and the
//! unconditional removal path shared by the trimmer and an editor's
//! error-commit.

use crate::error::{validate_key, CacheError};
use crate::paths::clean_path;
use crate::{Cache, Shared};
use journal::JournalRecord;
use std::fs;

impl Cache {
    /// Removes `key` if present and not currently being edited.
    ///
    /// Deletes its clean files, subtracts its length from `size`, and
    /// appends a `REMOVE` record. Returns `false` without touching anything
    /// if `key` is absent or mid-edit.
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        validate_key(key)?;
        if self.shared.state.lock().unwrap().closed {
            return Err(CacheError::Closed);
        }
        self.shared.remove_if_idle(key)
    }
}

impl Shared {
    /// Looks up `key` (bumping its recency the same way a lookup always
    /// does, even on a path that ends up refusing) and, if it exists and
    /// has no live editor, hands off to [`force_remove`](Shared::force_remove).
    fn remove_if_idle(&self, key: &str) -> Result<bool, CacheError> {
        {
            let mut state = self.state.lock().unwrap();
            match state.index.get_mut(key) {
                None => return Ok(false),
                Some(entry) if entry.current_editor.is_some() => return Ok(false),
                Some(_) => {}
            }
        }
        self.force_remove(key)?;
        Ok(true)
    }

    /// Removes `key` from the index unconditionally, deleting whatever
    /// clean files it has, adjusting `size`, and appending a `REMOVE`
    /// record. Used by the trimmer (evicting an idle LRU entry) and by an
    /// editor's error-commit (which has already deleted the dirty files and
    /// just needs the entry gone).
    ///
    /// A no-op if the cache is closed or `key` isn't tracked.
    pub(crate) fn force_remove(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Ok(());
        }
        let Some(entry) = state.index.remove(key) else {
            return Ok(());
        };

        for i in 0..entry.lengths.len() {
            let path = clean_path(&self.directory, key, i);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }

        state.size = state.size.saturating_sub(entry.total_len());
        state.append_record(JournalRecord::Remove {
            key: key.to_string(),
        })?;
        drop(state);

        self.maybe_schedule_trim();
        Ok(())
    }
}
