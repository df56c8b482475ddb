use super::helpers::{commit, open_at, read_slot};
use crate::CacheError;

#[test]
fn reopen_with_mismatched_app_version_wipes_and_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = open_at(dir.path(), 1, 1, 100);
        commit(&cache, "a", &[b"hello"]);
        cache.close().unwrap();
    }

    let cache = open_at(dir.path(), 2, 1, 100);
    assert_eq!(cache.len(), 0);
    assert!(read_slot(&cache, "a", 0).is_none());
}

#[test]
fn reopen_with_mismatched_value_count_wipes_and_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = open_at(dir.path(), 1, 1, 100);
        commit(&cache, "a", &[b"hello"]);
        cache.close().unwrap();
    }

    let cache = open_at(dir.path(), 1, 2, 100);
    assert_eq!(cache.len(), 0);
}

#[test]
fn dangling_dirty_record_with_no_later_clean_is_dropped_on_open() {
    use journal::{JournalHeader, JournalRecord, JournalWriter};

    let dir = tempfile::tempdir().unwrap();
    let tmp = dir.path().join("journal.tmp");
    let path = dir.path().join("journal");
    {
        let mut w = JournalWriter::create_fresh(
            &tmp,
            &path,
            &JournalHeader {
                app_version: 1,
                value_count: 1,
            },
        )
        .unwrap();
        w.append(&JournalRecord::Dirty { key: "k".into() }).unwrap();
    }
    // Leave a stray dirty file behind, as a crashed edit would.
    std::fs::write(dir.path().join("k.0.tmp"), b"partial").unwrap();

    let cache = open_at(dir.path(), 1, 1, 100);
    assert_eq!(cache.len(), 0);
    assert!(!dir.path().join("k.0.tmp").exists());
}

#[test]
fn stale_journal_tmp_is_removed_on_open() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = open_at(dir.path(), 1, 1, 100);
        commit(&cache, "a", &[b"hello"]);
        cache.close().unwrap();
    }
    std::fs::write(dir.path().join("journal.tmp"), b"stale").unwrap();

    let _cache = open_at(dir.path(), 1, 1, 100);
    assert!(!dir.path().join("journal.tmp").exists());
}

#[test]
fn read_record_bumps_recency_on_replay() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = open_at(dir.path(), 1, 1, 100);
        commit(&cache, "a", &[b"1"]);
        commit(&cache, "b", &[b"2"]);
        // Touch "a" so it becomes most-recent; "b" is now the eviction
        // candidate.
        let _ = cache.get("a").unwrap();
        cache.close().unwrap();
    }

    let cache = open_at(dir.path(), 1, 1, 1);
    cache.flush().unwrap();
    assert!(read_slot(&cache, "b", 0).is_none(), "b should be LRU after replay and get evicted");
    assert_eq!(read_slot(&cache, "a", 0).unwrap(), b"1");
}

#[test]
fn get_and_edit_reject_invalid_keys() {
    let (_dir, cache) = super::helpers::open(1, 100);
    assert!(matches!(cache.get("bad key"), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.edit("bad\rkey"), Err(CacheError::InvalidKey(_))));
}

#[test]
fn operations_on_closed_cache_error() {
    let (_dir, cache) = super::helpers::open(1, 100);
    cache.close().unwrap();

    assert!(matches!(cache.get("k"), Err(CacheError::Closed)));
    assert!(matches!(cache.edit("k"), Err(CacheError::Closed)));
    assert!(matches!(cache.remove("k"), Err(CacheError::Closed)));
}

#[test]
fn rebuild_journal_does_not_change_observable_state() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_at(dir.path(), 1, 1, 100);
    commit(&cache, "a", &[b"1"]);
    commit(&cache, "b", &[b"22"]);
    let _ = cache.get("a").unwrap();

    let size_before = cache.size();
    let len_before = cache.len();

    cache.force_rebuild_journal().unwrap();

    assert_eq!(cache.size(), size_before);
    assert_eq!(cache.len(), len_before);
    assert_eq!(read_slot(&cache, "a", 0).unwrap(), b"1");
    assert_eq!(read_slot(&cache, "b", 0).unwrap(), b"22");
}

#[test]
fn delete_removes_directory_contents() {
    let dir = tempfile::tempdir().unwrap();
    let cache = open_at(dir.path(), 1, 1, 100);
    commit(&cache, "a", &[b"hello"]);

    cache.delete().unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
