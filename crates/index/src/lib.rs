//! # Index — the access-ordered in-memory entry table
//!
//! Wraps [`lru::LruCache`] with the specific operations the cache core needs:
//! a `get`/`put` that bump recency, a peek that doesn't
//! ([`eviction_candidate`](EntryIndex::eviction_candidate)), and an
//! oldest-to-newest iterator for journal rebuild and diagnostics.
//!
//! `current_editor` is a generation counter rather than a reference back to
//! the in-flight editor (that type lives one layer up, in the `cache`
//! crate): the index owns every `Entry` outright, and a literal back-pointer
//! would need the entry to borrow from its own owner. Bumping a counter on
//! every `edit()` call and having the editor remember "my generation was N"
//! gives the same dangling-editor detection without a cycle.

use lru::LruCache;

/// One logical cache entry: per-slot byte lengths, readability, and whether
/// an edit currently owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Byte length of each published slot; `0` for a slot never published.
    pub lengths: Vec<u64>,
    /// Set once the entry has been successfully committed at least once.
    pub readable: bool,
    /// Generation id of the in-progress edit, if any. `None` means no editor
    /// currently owns this entry.
    pub current_editor: Option<u64>,
}

impl Entry {
    /// A brand-new, unpublished entry with `value_count` zeroed slots.
    pub fn new(value_count: usize) -> Self {
        Self {
            lengths: vec![0; value_count],
            readable: false,
            current_editor: None,
        }
    }

    /// Sum of all slot lengths — this entry's contribution to total cache size.
    pub fn total_len(&self) -> u64 {
        self.lengths.iter().sum()
    }
}

/// Access-ordered key → [`Entry`] table.
///
/// Backed by an unbounded `lru::LruCache` (capacity is `usize::MAX`): this
/// index never evicts on its own — eviction is a deliberate decision made by
/// the trimmer, not a side effect of insertion order filling up a fixed-size
/// ring.
pub struct EntryIndex {
    inner: LruCache<String, Entry>,
}

impl EntryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            inner: LruCache::unbounded(),
        }
    }

    /// Returns the entry for `key` and marks it most-recently-used.
    /// A silent no-op (returns `None`) if absent — it does not move anything.
    pub fn get(&mut self, key: &str) -> Option<&Entry> {
        self.inner.get(key)
    }

    /// Returns a mutable reference to the entry for `key`, bumping recency.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.inner.get_mut(key)
    }

    /// Looks up `key` without affecting its position in the access order.
    pub fn peek(&self, key: &str) -> Option<&Entry> {
        self.inner.peek(key)
    }

    /// Inserts `entry` at the most-recently-used end, replacing any prior
    /// entry for `key`. Returns the replaced entry, if any.
    pub fn put(&mut self, key: String, entry: Entry) -> Option<Entry> {
        self.inner.put(key, entry)
    }

    /// Removes and returns the entry for `key`, if any.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.inner.pop(key)
    }

    /// Returns the key and entry least recently touched, without changing its
    /// position — the trimmer's candidate for eviction.
    pub fn eviction_candidate(&self) -> Option<(&String, &Entry)> {
        self.inner.peek_lru()
    }

    /// Iterates every entry from least- to most-recently-used.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        // `lru::LruCache::iter` yields most-recent-first; reverse it so
        // callers (rebuild, diagnostics) see the order documented above.
        self.inner.iter().collect::<Vec<_>>().into_iter().rev()
    }

    /// Number of entries currently tracked.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// `true` if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Removes every entry, for use by the corruption-recovery path.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Default for EntryIndex {
    fn default() -> Self {
        Self::new()
    }
}
