use super::helpers::{commit, open, read_slot};
use crate::CacheError;
use std::io::Write;

#[test]
fn second_edit_on_same_key_returns_none() {
    let (_dir, cache) = open(1, 100);
    let _first = cache.edit("k").unwrap().unwrap();
    assert!(cache.edit("k").unwrap().is_none());
}

#[test]
fn editor_is_usable_again_after_prior_edit_completes() {
    let (_dir, cache) = open(1, 100);
    {
        let mut editor = cache.edit("k").unwrap().unwrap();
        editor.new_writer(0).unwrap().write_all(b"v1").unwrap();
        editor.commit().unwrap();
    }
    assert!(cache.edit("k").unwrap().is_some());
}

#[test]
fn commit_on_new_entry_missing_a_slot_is_illegal_state() {
    let (_dir, cache) = open(2, 100);
    let mut editor = cache.edit("k").unwrap().unwrap();
    editor.new_writer(0).unwrap().write_all(b"only-slot-0").unwrap();
    // Slot 1 was never written.
    let result = editor.commit();
    assert!(matches!(result, Err(CacheError::IllegalState(_))));
    assert!(read_slot(&cache, "k", 0).is_none());
}

#[test]
fn commit_on_existing_entry_skipping_a_slot_keeps_its_previous_value() {
    let (_dir, cache) = open(2, 100);
    commit(&cache, "k", &[b"a0", b"b0"]);

    let mut editor = cache.edit("k").unwrap().unwrap();
    editor.new_writer(0).unwrap().write_all(b"a1").unwrap();
    // Slot 1's dirty file is never created; it should default to its
    // previous value.
    editor.commit().unwrap();

    assert_eq!(read_slot(&cache, "k", 0).unwrap(), b"a1");
    assert_eq!(read_slot(&cache, "k", 1).unwrap(), b"b0");
}

#[test]
fn methods_after_commit_return_editor_closed() {
    let (_dir, cache) = open(1, 100);
    let mut editor = cache.edit("k").unwrap().unwrap();
    editor.new_writer(0).unwrap().write_all(b"v1").unwrap();
    editor.commit().unwrap();

    assert!(matches!(editor.commit(), Err(CacheError::EditorClosed)));
    assert!(matches!(editor.abort(), Err(CacheError::EditorClosed)));
    assert!(matches!(editor.new_writer(0), Err(CacheError::EditorClosed)));
}

#[test]
fn dropping_an_editor_without_commit_or_abort_cleans_up_dirty_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache = super::helpers::open_at(dir.path(), 1, 1, 100);

    {
        let editor = cache.edit("k").unwrap().unwrap();
        editor.new_writer(0).unwrap().write_all(b"orphaned").unwrap();
    }

    assert!(!dir.path().join("k.0.tmp").exists());
    assert!(read_slot(&cache, "k", 0).is_none());
}

#[test]
fn new_writer_rejects_out_of_range_slot_index() {
    let (_dir, cache) = open(1, 100);
    let editor = cache.edit("k").unwrap().unwrap();
    assert!(matches!(
        editor.new_writer(1),
        Err(CacheError::InvalidArgument(_))
    ));
}
