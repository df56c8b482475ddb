use crate::{Cache, CacheError};
use config::CacheConfig;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;

/// Opens a cache rooted at a fresh temp directory, returning both the
/// directory (kept alive so it isn't cleaned up underneath the cache) and
/// the handle.
pub fn open(value_count: usize, max_size: u64) -> (TempDir, Cache) {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_at(dir.path(), 1, value_count, max_size);
    (dir, cache)
}

pub fn open_at(dir: &Path, app_version: i32, value_count: usize, max_size: u64) -> Cache {
    let config = CacheConfig::new(dir, app_version, value_count, max_size).unwrap();
    Cache::open(config).unwrap()
}

/// Writes `values[i]` to slot `i` of a fresh or existing edit on `key`, then
/// commits. Panics (via `unwrap`) on any failure — tests using this helper
/// are asserting the happy path.
pub fn commit(cache: &Cache, key: &str, values: &[&[u8]]) {
    let mut editor = cache.edit(key).unwrap().expect("no editor in progress");
    for (i, value) in values.iter().enumerate() {
        editor.new_writer(i).unwrap().write_all(value).unwrap();
    }
    editor.commit().unwrap();
}

/// Reads slot `index` of `key` into a `Vec<u8>`, or `None` if the key has no
/// published snapshot.
pub fn read_slot(cache: &Cache, key: &str, index: usize) -> Option<Vec<u8>> {
    let snapshot = cache.get(key).unwrap()?;
    let mut buf = Vec::new();
    snapshot.reader(index).unwrap().read_to_end(&mut buf).unwrap();
    Some(buf)
}

pub fn expect_closed<T: std::fmt::Debug>(result: Result<T, CacheError>) {
    assert!(matches!(result, Err(CacheError::Closed)), "{result:?}");
}
