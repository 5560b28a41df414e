//! Insertion-ordered entry map.
//!
//! The log's serialization and traversal determinism depend on iterating
//! entries in a stable order. [`EntryMap`] wraps an [`IndexMap`] keyed by
//! content address: a key keeps the position of its *first* insertion, a
//! later `set` replaces the value in place, and iteration follows
//! insertion order.

use indexmap::IndexMap;

use super::Entry;

/// Insertion-ordered mapping from content address to entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryMap {
    inner: IndexMap<String, Entry>,
}

impl EntryMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from entries, deduplicating by hash. The first
    /// occurrence of a hash fixes its position.
    #[must_use]
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut map = Self::new();
        for entry in entries {
            map.set(entry.hash.clone(), entry.clone());
        }
        map
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up an entry by content address.
    #[must_use]
    pub fn get(&self, hash: &str) -> Option<&Entry> {
        self.inner.get(hash)
    }

    /// Returns `true` if an entry exists under `hash`.
    #[must_use]
    pub fn has(&self, hash: &str) -> bool {
        self.inner.contains_key(hash)
    }

    /// Insert or replace the entry under `hash`.
    ///
    /// Replacing keeps the key's original insertion position.
    pub fn set(&mut self, hash: String, entry: Entry) {
        self.inner.insert(hash, entry);
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    /// Iterate `(hash, entry)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.inner.iter()
    }

    /// Clone the values out in insertion order.
    #[must_use]
    pub fn slice(&self) -> Vec<Entry> {
        self.inner.values().cloned().collect()
    }

    /// Merge `other` into `self`: values from `other` win, but keys already
    /// present keep their position; new keys append in `other`'s order.
    pub fn merge(&mut self, other: &EntryMap) {
        for (hash, entry) in &other.inner {
            self.inner.insert(hash.clone(), entry.clone());
        }
    }
}

impl<'a> IntoIterator for &'a EntryMap {
    type Item = (&'a String, &'a Entry);
    type IntoIter = indexmap::map::Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
