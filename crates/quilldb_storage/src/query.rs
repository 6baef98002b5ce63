//! Index queries.

use quilldb_codec::Key;
use std::collections::BTreeMap;
use std::ops::Bound;

/// A predicate over index (or primary) keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every key.
    All,
    /// Keys equal to the value.
    Equals(Key),
    /// Keys equal to any of the values. An empty list matches nothing.
    AnyOf(Vec<Key>),
    /// Keys within the bounds. An inverted range matches nothing.
    Range {
        /// Lower bound.
        lower: Bound<Key>,
        /// Upper bound.
        upper: Bound<Key>,
    },
    /// Text keys starting with the prefix.
    StartsWith(String),
}

impl Predicate {
    /// Creates a range predicate.
    pub fn range(lower: Bound<Key>, upper: Bound<Key>) -> Self {
        Predicate::Range { lower, upper }
    }

    /// Returns true if the key satisfies the predicate.
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Equals(k) => k == key,
            Predicate::AnyOf(keys) => keys.contains(key),
            Predicate::Range { lower, upper } => {
                let above = match lower {
                    Bound::Included(l) => key >= l,
                    Bound::Excluded(l) => key > l,
                    Bound::Unbounded => true,
                };
                let below = match upper {
                    Bound::Included(u) => key <= u,
                    Bound::Excluded(u) => key < u,
                    Bound::Unbounded => true,
                };
                above && below
            }
            Predicate::StartsWith(prefix) => key.as_text().is_some_and(|s| s.starts_with(prefix)),
        }
    }

    /// Returns true if no key can satisfy the predicate.
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::AnyOf(keys) => keys.is_empty(),
            Predicate::Range { lower, upper } => match (lower, upper) {
                (Bound::Included(l), Bound::Included(u)) => l > u,
                (Bound::Included(l), Bound::Excluded(u))
                | (Bound::Excluded(l), Bound::Included(u))
                | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
                _ => false,
            },
            _ => false,
        }
    }

    /// Collects the values of every matching entry of an ordered map.
    ///
    /// Uses range lookups where the predicate allows it.
    pub fn select<'a, V>(&self, entries: &'a BTreeMap<Key, V>) -> Vec<(&'a Key, &'a V)> {
        if self.is_empty() {
            return Vec::new();
        }
        match self {
            Predicate::All => entries.iter().collect(),
            Predicate::Equals(k) => entries.get_key_value(k).into_iter().collect(),
            Predicate::AnyOf(keys) => {
                let mut sorted: Vec<&Key> = keys.iter().collect();
                sorted.sort();
                sorted.dedup();
                sorted
                    .into_iter()
                    .filter_map(|k| entries.get_key_value(k))
                    .collect()
            }
            Predicate::Range { lower, upper } => entries
                .range((lower.as_ref(), upper.as_ref()))
                .collect(),
            Predicate::StartsWith(prefix) => entries
                .range((Bound::Included(Key::Text(prefix.clone())), Bound::Unbounded))
                .take_while(|(k, _)| k.as_text().is_some_and(|s| s.starts_with(prefix.as_str())))
                .collect(),
        }
    }
}

/// A query against one table: an index (or the primary key) and a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Index name, or `None` for the primary key.
    pub index: Option<String>,
    /// Predicate over the index keys.
    pub predicate: Predicate,
}

impl IndexQuery {
    /// Matches every record of the table.
    pub fn all() -> Self {
        Self {
            index: None,
            predicate: Predicate::All,
        }
    }

    /// Queries the primary key.
    pub fn primary(predicate: Predicate) -> Self {
        Self {
            index: None,
            predicate,
        }
    }

    /// Queries a secondary index.
    pub fn index(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            index: Some(name.into()),
            predicate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<Key, u32> {
        [
            (Key::Integer(1), 1),
            (Key::Integer(5), 5),
            (Key::Integer(9), 9),
            (Key::from("apple"), 10),
            (Key::from("apricot"), 11),
            (Key::from("banana"), 12),
        ]
        .into_iter()
        .collect()
    }

    fn values(p: &Predicate) -> Vec<u32> {
        p.select(&sample()).into_iter().map(|(_, v)| *v).collect()
    }

    #[test]
    fn empty_any_of_selects_nothing() {
        let p = Predicate::AnyOf(vec![]);
        assert!(p.is_empty());
        assert!(values(&p).is_empty());
        assert!(!p.matches(&Key::Integer(1)));
    }

    #[test]
    fn any_of_ignores_duplicates() {
        let p = Predicate::AnyOf(vec![Key::Integer(9), Key::Integer(1), Key::Integer(9)]);
        assert_eq!(values(&p), vec![1, 9]);
    }

    #[test]
    fn inverted_range_is_empty_not_a_panic() {
        let p = Predicate::range(Bound::Included(Key::Integer(9)), Bound::Included(Key::Integer(1)));
        assert!(p.is_empty());
        assert!(values(&p).is_empty());

        let p = Predicate::range(Bound::Excluded(Key::Integer(5)), Bound::Excluded(Key::Integer(5)));
        assert!(values(&p).is_empty());
    }

    #[test]
    fn range_bounds() {
        let p = Predicate::range(Bound::Excluded(Key::Integer(1)), Bound::Included(Key::Integer(9)));
        assert_eq!(values(&p), vec![5, 9]);
        assert!(p.matches(&Key::Integer(9)));
        assert!(!p.matches(&Key::Integer(1)));
    }

    #[test]
    fn starts_with_prefix() {
        let p = Predicate::StartsWith("ap".into());
        assert_eq!(values(&p), vec![10, 11]);
        assert!(!p.matches(&Key::Integer(1)));
    }
}
