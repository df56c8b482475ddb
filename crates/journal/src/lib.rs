//! # Journal — the cache's append-only recovery log
//!
//! Every state transition a cache entry goes through (an edit starting, an
//! edit publishing, a removal, a read bumping recency) is appended here
//! **before** the in-memory index reflects it. On restart the journal is
//! replayed to reconstruct the index, so no acknowledged commit or removal is
//! lost to a crash.
//!
//! ## Binary format
//!
//! See [`format`] for the bit-exact header and record layout. Unlike a CRC'd
//! write-ahead log, this journal relies on a trailing `\n` per record as a
//! lightweight sanity terminator — a missing one (or any other header/record
//! mismatch) is treated as corruption by the reader, and the caller is
//! expected to wipe and start fresh (see the `cache` crate's recovery path).
//!
//! ## Example
//!
//! ```rust,no_run
//! use journal::{JournalHeader, JournalReader, JournalRecord, JournalWriter};
//! use std::path::Path;
//!
//! let header = JournalHeader { app_version: 1, value_count: 2 };
//! let mut w = JournalWriter::create_fresh(
//!     Path::new("journal.tmp"),
//!     Path::new("journal"),
//!     &header,
//! ).unwrap();
//! w.append(&JournalRecord::Dirty { key: "a".into() }).unwrap();
//!
//! let mut r = JournalReader::open(Path::new("journal")).unwrap();
//! let mut seen = Vec::new();
//! r.replay(|rec| seen.push(rec)).unwrap();
//! ```

pub mod format;
pub mod mutf8;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use format::{MAGIC, OP_CLEAN, OP_DIRTY, OP_READ, OP_REMOVE};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;

pub use format::JournalHeader;

/// A single parsed journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// `key` now has a fully published version; `lengths[i]` is the byte
    /// length of slot `i`.
    Clean { key: String, lengths: Vec<u64> },
    /// An edit on `key` has started but not yet committed or aborted.
    Dirty { key: String },
    /// `key` has been removed from the cache.
    Remove { key: String },
    /// `key` was read; replaying this bumps its LRU recency.
    Read { key: String },
}

impl JournalRecord {
    /// The key this record refers to, regardless of variant.
    pub fn key(&self) -> &str {
        match self {
            JournalRecord::Clean { key, .. }
            | JournalRecord::Dirty { key }
            | JournalRecord::Remove { key }
            | JournalRecord::Read { key } => key,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        match self {
            JournalRecord::Clean { key, lengths } => {
                buf.write_u8(OP_CLEAN)?;
                format::write_key(buf, key)?;
                for len in lengths {
                    buf.write_u64::<BigEndian>(*len)?;
                }
            }
            JournalRecord::Dirty { key } => {
                buf.write_u8(OP_DIRTY)?;
                format::write_key(buf, key)?;
            }
            JournalRecord::Remove { key } => {
                buf.write_u8(OP_REMOVE)?;
                format::write_key(buf, key)?;
            }
            JournalRecord::Read { key } => {
                buf.write_u8(OP_READ)?;
                format::write_key(buf, key)?;
            }
        }
        buf.write_u8(b'\n')?;
        Ok(())
    }
}

/// Errors from journal I/O or decoding.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The header or a record didn't match the expected bit layout: bad
    /// magic, bad version, a mismatched `app_version`/`value_count`, an
    /// unknown opcode, or a missing trailing `\n`.
    #[error("corrupt journal: {0}")]
    Corrupt(String),
}

impl JournalError {
    fn corrupt(msg: impl Into<String>) -> Self {
        JournalError::Corrupt(msg.into())
    }
}

/// Append-only journal writer.
///
/// Every [`append`](JournalWriter::append) call is a single `write_all`
/// followed by `flush` — there is no internal buffering across calls, so a
/// successful `append` means the bytes have left the process.
pub struct JournalWriter {
    file: File,
}

impl JournalWriter {
    /// Creates a brand-new journal: writes `header` to `tmp_path`, `fsync`s
    /// it, then atomically renames it over `final_path`. This is the only
    /// way a journal file comes into existence — there is no code path that
    /// writes a header directly to `final_path`, so a reader never observes
    /// a partially-written header.
    pub fn create_fresh(
        tmp_path: &Path,
        final_path: &Path,
        header: &JournalHeader,
    ) -> Result<Self, JournalError> {
        {
            let mut f = File::create(tmp_path)?;
            format::write_header(&mut f, header)?;
            f.flush()?;
            f.sync_all()?;
        }
        fs::rename(tmp_path, final_path)?;
        Self::open_append(final_path)
    }

    /// Opens an existing journal file for append-only writing.
    pub fn open_append(path: &Path) -> Result<Self, JournalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Serializes and appends `record`, then flushes.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        let mut buf = Vec::with_capacity(32);
        record.encode(&mut buf)?;
        self.file.write_all(&buf)?;
        self.file.flush()?;
        Ok(())
    }

    /// Flushes any buffered writes (a no-op on a raw [`File`], kept for
    /// symmetry with callers that treat the writer as a generic sink).
    pub fn flush(&mut self) -> Result<(), JournalError> {
        self.file.flush()?;
        Ok(())
    }
}

/// Sequential journal reader used during recovery.
pub struct JournalReader<R: Read> {
    rdr: BufReader<R>,
    value_count: u32,
}

impl JournalReader<File> {
    /// Opens `path`, reads and validates the header, and returns a reader
    /// positioned at the first record.
    pub fn open(path: &Path) -> Result<(Self, JournalHeader), JournalError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read> JournalReader<R> {
    /// Builds a reader from any [`Read`] implementor, reading and validating
    /// the header first. Useful for tests that replay an in-memory buffer.
    pub fn from_reader(reader: R) -> Result<(Self, JournalHeader), JournalError> {
        let mut rdr = BufReader::new(reader);
        let header = format::read_header(&mut rdr).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                JournalError::corrupt("truncated journal header")
            } else {
                JournalError::corrupt(e.to_string())
            }
        })?;
        Ok((
            Self {
                rdr,
                value_count: header.value_count,
            },
            header,
        ))
    }

    /// Replays every record, calling `apply` for each one in file order.
    ///
    /// Returns the total number of records replayed. A malformed record —
    /// including a missing trailing `\n` — is corruption and returns
    /// [`JournalError::Corrupt`]; a clean end-of-file is a normal return.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<usize, JournalError>
    where
        F: FnMut(JournalRecord),
    {
        let mut count = 0usize;
        loop {
            let opcode = match self.rdr.read_u8() {
                Ok(b) => b,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(count),
                Err(e) => return Err(e.into()),
            };

            let key = format::read_key(&mut self.rdr)
                .map_err(|e| JournalError::corrupt(format!("bad key: {e}")))?;

            let record = match opcode {
                OP_CLEAN => {
                    let mut lengths = Vec::with_capacity(self.value_count as usize);
                    for _ in 0..self.value_count {
                        lengths.push(self.rdr.read_u64::<BigEndian>().map_err(|e| {
                            JournalError::corrupt(format!("truncated CLEAN lengths: {e}"))
                        })?);
                    }
                    JournalRecord::Clean { key, lengths }
                }
                OP_DIRTY => JournalRecord::Dirty { key },
                OP_REMOVE => JournalRecord::Remove { key },
                OP_READ => JournalRecord::Read { key },
                other => {
                    return Err(JournalError::corrupt(format!("unknown opcode {other}")));
                }
            };

            let terminator = self.rdr.read_u8().map_err(|e| {
                JournalError::corrupt(format!("missing record terminator: {e}"))
            })?;
            if terminator != b'\n' {
                return Err(JournalError::corrupt("missing record terminator"));
            }

            apply(record);
            count += 1;
        }
    }
}

/// `MAGIC` re-exported for callers that want to sanity-check a raw file
/// without going through [`JournalReader`].
pub const JOURNAL_MAGIC: u64 = MAGIC;

#[cfg(test)]
mod tests;
