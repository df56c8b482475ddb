use super::helpers::{commit, open, read_slot};
use crate::CacheError;

#[test]
fn remove_absent_key_returns_false() {
    let (_dir, cache) = open(1, 100);
    assert!(!cache.remove("nope").unwrap());
}

#[test]
fn remove_published_key_deletes_it_and_frees_its_size() {
    let (_dir, cache) = open(1, 100);
    commit(&cache, "k", &[b"hello"]);
    assert_eq!(cache.size(), 5);

    assert!(cache.remove("k").unwrap());

    assert!(read_slot(&cache, "k", 0).is_none());
    assert_eq!(cache.size(), 0);
}

#[test]
fn remove_while_mid_edit_returns_false_and_leaves_editor_intact() {
    let (_dir, cache) = open(1, 100);
    let editor = cache.edit("k").unwrap().unwrap();

    assert!(!cache.remove("k").unwrap());
    // The in-progress edit is untouched: a second `edit` call still sees it
    // as live.
    assert!(cache.edit("k").unwrap().is_none());
    drop(editor);
}

#[test]
fn remove_rejects_invalid_keys() {
    let (_dir, cache) = open(1, 100);
    assert!(matches!(cache.remove("has space"), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.remove("has\nnewline"), Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.remove(""), Err(CacheError::InvalidKey(_))));
}

#[test]
fn remove_on_closed_cache_errors() {
    let (_dir, cache) = open(1, 100);
    cache.close().unwrap();
    assert!(matches!(cache.remove("k"), Err(CacheError::Closed)));
}
