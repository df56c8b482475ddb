//! [`Snapshot`] — a read handle over one published version of an entry.

use crate::error::CacheError;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};

/// A set of `value_count` open readers captured at the moment
/// [`Cache::get`](crate::Cache::get) was called.
///
/// Readers are opened eagerly, under the cache's lock, so a `Snapshot`
/// always reflects one consistent published version of its entry — even if
/// a later `edit` or `remove` touches the same key. On the Unix targets
/// this crate assumes, an open file descriptor stays valid (and keeps
/// reading the same bytes) after its directory entry is renamed over or
/// unlinked, so no copy-on-read is needed to honor that guarantee.
pub struct Snapshot {
    files: Vec<File>,
}

impl Snapshot {
    pub(crate) fn new(files: Vec<File>) -> Self {
        Self { files }
    }

    /// Number of slots this snapshot holds a reader for.
    pub fn value_count(&self) -> usize {
        self.files.len()
    }

    /// Byte length of slot `index`, as it was when this snapshot was taken.
    pub fn len(&self, index: usize) -> Result<u64, CacheError> {
        Ok(self.slot(index)?.metadata()?.len())
    }

    /// A buffered reader over slot `index`, seeked to its start.
    ///
    /// Each call hands back an independent reader over a cloned file
    /// descriptor, so callers may read a slot more than once, or read
    /// distinct slots concurrently from different threads, without
    /// interfering with each other's cursor position.
    pub fn reader(&self, index: usize) -> Result<BufReader<File>, CacheError> {
        let mut clone = self.slot(index)?.try_clone()?;
        clone.seek(SeekFrom::Start(0))?;
        Ok(BufReader::new(clone))
    }

    fn slot(&self, index: usize) -> Result<&File, CacheError> {
        self.files.get(index).ok_or_else(|| {
            CacheError::InvalidArgument(format!(
                "slot index {index} out of range (value_count = {})",
                self.files.len()
            ))
        })
    }
}
