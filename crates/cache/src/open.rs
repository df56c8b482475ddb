//! Open/recovery, close, delete, and flush — everything that spans the
//! cache's whole lifetime rather than a single entry.

use crate::error::CacheError;
use crate::paths::{self, clean_path, dirty_path, journal_path, journal_tmp_path, LOCK_FILE_NAME};
use crate::trimmer;
use crate::{Cache, Shared, State};
use config::CacheConfig;
use index::{Entry, EntryIndex};
use journal::{JournalHeader, JournalReader, JournalRecord, JournalWriter};
use std::fs;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A `redundant_op_count` at or above this many records, and at least as
/// large as the live entry count, triggers a journal rebuild.
const REDUNDANT_OP_COMPACT_THRESHOLD: u64 = 2000;

impl Cache {
    /// Opens (or creates) a cache at `config.directory`.
    ///
    /// Acquires an advisory lock on the directory, replays any existing
    /// journal into a fresh index, and repairs or recreates the journal as
    /// needed. A malformed journal is treated as corruption: the directory's
    /// contents are wiped and the cache starts empty.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        let dir = config.directory.clone();
        fs::create_dir_all(&dir)?;

        let lock = fsutil::DirLock::acquire(&dir, LOCK_FILE_NAME)?;

        let journal_file = journal_path(&dir);
        let mut index = EntryIndex::new();
        let mut total_records = 0usize;
        let mut opened_fresh = false;

        if journal_file.exists() {
            match Self::replay_existing(&journal_file, &config, &mut index) {
                Ok(count) => total_records = count,
                Err(reason) => {
                    warn!(directory = %dir.display(), %reason, "journal corrupt on open, wiping cache directory");
                    fsutil::remove_dir_contents(&dir)?;
                    index = EntryIndex::new();
                    opened_fresh = true;
                }
            }
        } else {
            opened_fresh = true;
        }

        let mut size = 0u64;
        Self::process_journal(&dir, &mut index, &mut size);
        let live_entries = index.len();

        let journal_writer = if opened_fresh {
            let header = JournalHeader {
                app_version: config.app_version,
                value_count: config.value_count as u32,
            };
            JournalWriter::create_fresh(&journal_tmp_path(&dir), &journal_file, &header)?
        } else {
            JournalWriter::open_append(&journal_file)?
        };

        let redundant_op_count = total_records.saturating_sub(live_entries) as u64;

        let (tx, rx) = std::sync::mpsc::sync_channel::<()>(1);

        let shared = Arc::new(Shared {
            directory: dir.clone(),
            app_version: config.app_version,
            value_count: config.value_count,
            max_size: config.max_size,
            state: Mutex::new(State {
                index,
                size,
                redundant_op_count,
                journal: Some(journal_writer),
                lock: Some(lock),
                closed: false,
                next_editor_id: 0,
            }),
            trimmer_tx: Mutex::new(Some(tx)),
            trimmer_handle: Mutex::new(None),
        });

        let handle = trimmer::spawn(Arc::downgrade(&shared), rx);
        *shared.trimmer_handle.lock().unwrap() = Some(handle);

        info!(directory = %dir.display(), entries = live_entries, size, "cache opened");

        Ok(Cache { shared })
    }

    /// Parses the header and replays every record into `index`. Returns the
    /// total record count on success, or an error string describing why the
    /// journal is being treated as corrupt.
    fn replay_existing(
        journal_file: &std::path::Path,
        config: &CacheConfig,
        index: &mut EntryIndex,
    ) -> Result<usize, String> {
        let (mut reader, header) =
            JournalReader::open(journal_file).map_err(|e| e.to_string())?;

        if header.app_version != config.app_version || header.value_count != config.value_count as u32
        {
            return Err(format!(
                "header mismatch: journal has app_version={}, value_count={}; config wants app_version={}, value_count={}",
                header.app_version, header.value_count, config.app_version, config.value_count
            ));
        }

        let value_count = config.value_count;
        reader
            .replay(|record| Self::apply_record(index, record, value_count))
            .map_err(|e| e.to_string())
    }

    fn apply_record(index: &mut EntryIndex, record: JournalRecord, value_count: usize) {
        match record {
            JournalRecord::Clean { key, lengths } => {
                if let Some(entry) = index.get_mut(&key) {
                    entry.lengths = lengths;
                    entry.readable = true;
                    entry.current_editor = None;
                } else {
                    index.put(
                        key,
                        Entry {
                            lengths,
                            readable: true,
                            current_editor: None,
                        },
                    );
                }
            }
            JournalRecord::Dirty { key } => {
                if let Some(entry) = index.get_mut(&key) {
                    entry.current_editor = Some(0);
                } else {
                    let mut entry = Entry::new(value_count);
                    entry.current_editor = Some(0);
                    index.put(key, entry);
                }
            }
            JournalRecord::Remove { key } => {
                index.remove(&key);
            }
            JournalRecord::Read { key } => {
                index.get(&key);
            }
        }
    }

    /// Deletes a stale `journal.tmp`, if any, and drops entries left with a
    /// dangling in-progress edit (a `DIRTY` with no later `CLEAN`/`REMOVE`),
    /// cleaning up their clean and dirty files. Accumulates `size` from the
    /// entries that remain.
    fn process_journal(dir: &std::path::Path, index: &mut EntryIndex, size: &mut u64) {
        let tmp = journal_tmp_path(dir);
        if tmp.exists() {
            let _ = fs::remove_file(&tmp);
        }

        let dangling: Vec<String> = index
            .iter()
            .filter(|(_, e)| e.current_editor.is_some())
            .map(|(k, _)| k.clone())
            .collect();

        for key in dangling {
            if let Some(entry) = index.remove(&key) {
                for i in 0..entry.lengths.len() {
                    let _ = fs::remove_file(clean_path(dir, &key, i));
                    let _ = fs::remove_file(dirty_path(dir, &key, i));
                }
            }
        }

        *size = index.iter().map(|(_, e)| e.total_len()).sum();
    }

    /// `true` iff a journal rebuild would meaningfully shrink the journal:
    /// enough redundant records have accumulated, proportional to how many
    /// live entries a rebuild would need to re-emit.
    pub(crate) fn journal_rebuild_required(redundant_op_count: u64, live_entries: usize) -> bool {
        redundant_op_count >= REDUNDANT_OP_COMPACT_THRESHOLD && redundant_op_count >= live_entries as u64
    }

    /// Runs [`flush`](Cache::flush) and closes the journal stream and
    /// directory lock. A closed cache rejects all further operations.
    pub fn close(&self) -> Result<(), CacheError> {
        self.shared.close_internal()
    }

    /// Closes the cache, then recursively deletes the directory's contents.
    pub fn delete(&self) -> Result<(), CacheError> {
        self.shared.close_internal()?;
        fsutil::remove_dir_contents(&self.shared.directory)?;
        Ok(())
    }

    /// Trims to size, then flushes the journal stream.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.shared.run_flush()
    }

    /// Test-only hook: runs a journal rebuild unconditionally, bypassing
    /// the `redundant_op_count` threshold that normally gates it.
    #[cfg(test)]
    pub(crate) fn force_rebuild_journal(&self) -> Result<(), CacheError> {
        self.shared.rebuild_journal()
    }
}

impl Shared {
    /// Best-effort stop: aborts dangling editors, trims, flushes, stops the
    /// trimmer thread, and releases the directory lock. Idempotent — called
    /// from both `Cache::close` and `Cache::delete`, and from `Drop` if the
    /// caller never closed explicitly.
    pub(crate) fn close_internal(&self) -> Result<(), CacheError> {
        self.abort_dangling_editors()?;
        self.run_flush()?;

        if let Some(tx) = self.trimmer_tx.lock().unwrap().take() {
            drop(tx);
        }
        if let Some(handle) = self.trimmer_handle.lock().unwrap().take() {
            let _ = handle.join();
        }

        let mut state = self.state.lock().unwrap();
        state.journal = None;
        state.lock = None;
        state.closed = true;
        info!(directory = %self.directory.display(), "cache closed");
        Ok(())
    }

    /// Trims to size, then flushes the journal stream. A closed cache is a
    /// silent no-op (so `close` can call this unconditionally).
    pub(crate) fn run_flush(&self) -> Result<(), CacheError> {
        self.trim_to_size()?;
        let mut state = self.state.lock().unwrap();
        if let Some(journal) = state.journal.as_mut() {
            journal.flush()?;
        }
        Ok(())
    }

    /// Evicts entries from the access-ordered end until `size <= max_size`,
    /// skipping any entry currently mid-edit (its dirty files are owned by
    /// a live `Editor` and must not be touched here). If every oversized
    /// entry happens to be mid-edit, this returns having made no further
    /// progress — transient overshoot is allowed (§1 non-goals).
    pub(crate) fn trim_to_size(&self) -> Result<(), CacheError> {
        loop {
            let key = {
                let state = self.state.lock().unwrap();
                if state.closed || state.size <= self.max_size {
                    None
                } else {
                    state
                        .index
                        .iter()
                        .find(|(_, e)| e.current_editor.is_none())
                        .map(|(k, _)| k.clone())
                }
            };
            let Some(key) = key else { return Ok(()) };
            debug!(key = %key, "trimmer evicting entry");
            self.force_remove(&key)?;
        }
    }

    /// `true` iff the next scheduled trimmer pass should also rebuild the
    /// journal, per [`Cache::journal_rebuild_required`].
    pub(crate) fn is_rebuild_required(&self) -> bool {
        let state = self.state.lock().unwrap();
        !state.closed && Cache::journal_rebuild_required(state.redundant_op_count, state.index.len())
    }

    fn abort_dangling_editors(&self) -> Result<(), CacheError> {
        let dir = self.directory.clone();
        let value_count = self.value_count;
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Ok(());
        }

        let dangling: Vec<(String, bool, Vec<u64>)> = state
            .index
            .iter()
            .filter(|(_, e)| e.current_editor.is_some())
            .map(|(k, e)| (k.clone(), e.readable, e.lengths.clone()))
            .collect();

        for (key, readable, lengths) in dangling {
            for i in 0..value_count {
                let _ = fs::remove_file(dirty_path(&dir, &key, i));
            }
            if readable {
                if let Some(entry) = state.index.get_mut(&key) {
                    entry.current_editor = None;
                }
                state.append_record(JournalRecord::Clean { key, lengths })?;
            } else {
                state.index.remove(&key);
                state.append_record(JournalRecord::Remove { key })?;
            }
        }
        Ok(())
    }

    /// Rewrites the journal down to one record per live entry, resetting
    /// `redundant_op_count` to zero. The rename is the commit point — a
    /// rebuild is never observed half-done.
    pub(crate) fn rebuild_journal(&self) -> Result<(), CacheError> {
        let dir = self.directory.clone();
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Ok(());
        }

        state.journal = None;

        let tmp_path = journal_tmp_path(&dir);
        let header = JournalHeader {
            app_version: self.app_version,
            value_count: self.value_count as u32,
        };
        {
            let mut writer =
                JournalWriter::create_fresh(&tmp_path, &paths::journal_path(&dir), &header)?;
            for (key, entry) in state.index.iter() {
                let record = if entry.current_editor.is_some() {
                    JournalRecord::Dirty { key: key.clone() }
                } else {
                    JournalRecord::Clean {
                        key: key.clone(),
                        lengths: entry.lengths.clone(),
                    }
                };
                writer.append(&record)?;
            }
            writer.flush()?;
        }

        state.journal = Some(JournalWriter::open_append(&paths::journal_path(&dir))?);
        state.redundant_op_count = 0;
        info!(directory = %dir.display(), entries = state.index.len(), "journal rebuilt");
        Ok(())
    }
}
