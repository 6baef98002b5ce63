//! Secondary index maintenance.

use crate::query::Predicate;
use crate::schema::IndexSpec;
use quilldb_codec::Key;
use std::collections::{BTreeMap, BTreeSet};

/// Committed entries of one secondary index.
///
/// Maps each index key to the primary keys of the records carrying it.
/// A unique index never holds more than one primary key per index key;
/// that is checked by the store before entries are inserted.
#[derive(Debug, Clone)]
pub struct SecondaryIndex {
    spec: IndexSpec,
    entries: BTreeMap<Key, BTreeSet<Key>>,
}

impl SecondaryIndex {
    /// Creates an empty index.
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the index specification.
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Adds an entry.
    pub fn insert(&mut self, index_key: Key, primary: Key) {
        self.entries.entry(index_key).or_default().insert(primary);
    }

    /// Removes an entry. Returns true if it was present.
    pub fn remove(&mut self, index_key: &Key, primary: &Key) -> bool {
        let Some(set) = self.entries.get_mut(index_key) else {
            return false;
        };
        let removed = set.remove(primary);
        if set.is_empty() {
            self.entries.remove(index_key);
        }
        removed
    }

    /// Returns the primary keys carrying an index key.
    pub fn owners(&self, index_key: &Key) -> impl Iterator<Item = &Key> {
        self.entries.get(index_key).into_iter().flatten()
    }

    /// Returns `(index key, primary key)` pairs matching the predicate, in order.
    pub fn select(&self, predicate: &Predicate) -> Vec<(Key, Key)> {
        predicate
            .select(&self.entries)
            .into_iter()
            .flat_map(|(ik, pks)| pks.iter().map(move |pk| (ik.clone(), pk.clone())))
            .collect()
    }

    /// Returns the number of distinct index keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
