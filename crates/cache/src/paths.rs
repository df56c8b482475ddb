//! Pure functions mapping `(directory, key, slot)` to on-disk paths. No
//! filesystem access happens here.

use std::path::{Path, PathBuf};

pub(crate) const JOURNAL_FILE_NAME: &str = "journal";
pub(crate) const JOURNAL_TMP_FILE_NAME: &str = "journal.tmp";
pub(crate) const LOCK_FILE_NAME: &str = "cache.lock";

/// The clean (published) path for slot `index` of `key`.
pub(crate) fn clean_path(dir: &Path, key: &str, index: usize) -> PathBuf {
    dir.join(format!("{key}.{index}"))
}

/// The dirty (in-progress) path for slot `index` of `key`.
pub(crate) fn dirty_path(dir: &Path, key: &str, index: usize) -> PathBuf {
    dir.join(format!("{key}.{index}.tmp"))
}

pub(crate) fn journal_path(dir: &Path) -> PathBuf {
    dir.join(JOURNAL_FILE_NAME)
}

pub(crate) fn journal_tmp_path(dir: &Path) -> PathBuf {
    dir.join(JOURNAL_TMP_FILE_NAME)
}
