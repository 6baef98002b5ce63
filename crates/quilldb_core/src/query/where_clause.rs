//! Query entry points.

use crate::query::Collection;
use crate::table::Table;
use quilldb_codec::Key;
use quilldb_storage::{IndexQuery, Predicate};
use std::ops::Bound;

/// A field selected by [`Table::where_field`], waiting for a predicate.
///
/// Every method returns a lazy [`Collection`]. Naming a field that is
/// neither the primary key nor an index is reported as
/// [`CoreError::Query`](crate::CoreError::Query) when the collection runs.
#[derive(Debug, Clone)]
pub struct WhereClause {
    table: Table,
    index: Option<String>,
}

impl WhereClause {
    pub(crate) fn new(table: Table, index: Option<String>) -> Self {
        Self { table, index }
    }

    /// Returns the queried index, or `None` for the primary key.
    #[must_use]
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Matches records whose field equals `value`.
    #[must_use]
    pub fn equals(self, value: impl Into<Key>) -> Collection {
        self.collect(Predicate::Equals(value.into()))
    }

    /// Matches records whose field equals any of `values`.
    ///
    /// An empty list is a valid query that matches nothing.
    #[must_use]
    pub fn any_of<K: Into<Key>>(self, values: impl IntoIterator<Item = K>) -> Collection {
        self.collect(Predicate::AnyOf(values.into_iter().map(Into::into).collect()))
    }

    /// Matches records whose field is greater than `value`.
    #[must_use]
    pub fn above(self, value: impl Into<Key>) -> Collection {
        self.range(Bound::Excluded(value.into()), Bound::Unbounded)
    }

    /// Matches records whose field is greater than or equal to `value`.
    #[must_use]
    pub fn above_or_equal(self, value: impl Into<Key>) -> Collection {
        self.range(Bound::Included(value.into()), Bound::Unbounded)
    }

    /// Matches records whose field is less than `value`.
    #[must_use]
    pub fn below(self, value: impl Into<Key>) -> Collection {
        self.range(Bound::Unbounded, Bound::Excluded(value.into()))
    }

    /// Matches records whose field is less than or equal to `value`.
    #[must_use]
    pub fn below_or_equal(self, value: impl Into<Key>) -> Collection {
        self.range(Bound::Unbounded, Bound::Included(value.into()))
    }

    /// Matches `lower <= field < upper`.
    #[must_use]
    pub fn between(self, lower: impl Into<Key>, upper: impl Into<Key>) -> Collection {
        self.range(Bound::Included(lower.into()), Bound::Excluded(upper.into()))
    }

    /// Matches records whose field lies within the bounds.
    #[must_use]
    pub fn range(self, lower: Bound<Key>, upper: Bound<Key>) -> Collection {
        self.collect(Predicate::range(lower, upper))
    }

    /// Matches text fields starting with `prefix`.
    #[must_use]
    pub fn starts_with(self, prefix: impl Into<String>) -> Collection {
        self.collect(Predicate::StartsWith(prefix.into()))
    }

    fn collect(self, predicate: Predicate) -> Collection {
        let query = match self.index {
            Some(index) => IndexQuery::index(index, predicate),
            None => IndexQuery::primary(predicate),
        };
        Collection::new(self.table, query)
    }
}
