//! Lazy record collections.

use crate::error::HookResult;
use crate::mutation::executor::{Mutation, MutatorFuture};
use crate::mutation::Modifications;
use crate::read::RecordFilter;
use crate::request::Request;
use crate::table::Table;
use quilldb_codec::{Key, Record};
use quilldb_storage::{AccessMode, IndexQuery};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The records of a table matching a query.
///
/// A collection is only a description. Nothing is read until a terminal
/// operation (`count`, `to_array`, `each`, `first`, `primary_keys`,
/// `modify`, `delete`) issues it on the table, inside the table's bound
/// transaction or an implicit one.
///
/// Filters run against the record as the `reading` hooks present it.
#[derive(Clone)]
pub struct Collection {
    table: Table,
    query: IndexQuery,
    filters: Vec<RecordFilter>,
    limit: Option<usize>,
}

impl Collection {
    pub(crate) fn new(table: Table, query: IndexQuery) -> Self {
        Self {
            table,
            query,
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Returns the underlying index query.
    #[must_use]
    pub fn query(&self) -> &IndexQuery {
        &self.query
    }

    /// Keeps only the records accepted by `predicate`.
    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(predicate));
        self
    }

    /// Stops after `n` records.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(self.limit.map_or(n, |current| current.min(n)));
        self
    }

    /// Counts the matching records.
    pub fn count(self) -> Request<usize> {
        let Collection {
            table,
            query,
            filters,
            limit,
        } = self;
        table.schedule(AccessMode::ReadOnly, move |scope| async move {
            if filters.is_empty() {
                let n = scope.store.count(scope.txn, &scope.table, &query)?;
                return Ok(limit.map_or(n, |max| n.min(max)));
            }
            scope.walk(&query, &filters, limit, |_| Ok(())).await
        })
    }

    /// Reads the matching records in index order.
    pub fn to_array(self) -> Request<Vec<Record>> {
        let Collection {
            table,
            query,
            filters,
            limit,
        } = self;
        table.schedule(AccessMode::ReadOnly, move |scope| async move {
            let mut records = Vec::new();
            scope
                .walk(&query, &filters, limit, |found| {
                    records.push(found.view);
                    Ok(())
                })
                .await?;
            Ok(records)
        })
    }

    /// Calls `f` with every matching record in index order.
    pub fn each<F>(self, mut f: F) -> Request<()>
    where
        F: FnMut(Record) + Send + 'static,
    {
        let Collection {
            table,
            query,
            filters,
            limit,
        } = self;
        table.schedule(AccessMode::ReadOnly, move |scope| async move {
            scope
                .walk(&query, &filters, limit, |found| {
                    f(found.view);
                    Ok(())
                })
                .await
                .map(drop)
        })
    }

    /// Reads the first matching record.
    pub fn first(self) -> Request<Option<Record>> {
        let Collection {
            table,
            query,
            filters,
            ..
        } = self;
        table.schedule(AccessMode::ReadOnly, move |scope| async move {
            let mut first = None;
            scope
                .walk(&query, &filters, Some(1), |found| {
                    first = Some(found.view);
                    Ok(())
                })
                .await?;
            Ok(first)
        })
    }

    /// Returns the primary keys of the matching records in index order.
    pub fn primary_keys(self) -> Request<Vec<Key>> {
        let Collection {
            table,
            query,
            filters,
            limit,
        } = self;
        table.schedule(AccessMode::ReadOnly, move |scope| async move {
            if filters.is_empty() {
                let mut keys = scope.store.scan(scope.txn, &scope.table, &query)?;
                if let Some(max) = limit {
                    keys.truncate(max);
                }
                return Ok(keys);
            }
            let mut keys = Vec::new();
            scope
                .walk(&query, &filters, limit, |found| {
                    keys.push(found.key);
                    Ok(())
                })
                .await?;
            Ok(keys)
        })
    }

    /// Edits every matching record in place with `mutator`.
    ///
    /// The callback receives the record as the `reading` hooks present it.
    /// Whatever it changes becomes the modification descriptor that runs
    /// through the `updating` and `writing` hooks. Resolves to the number of
    /// matching records.
    pub fn modify<F>(self, mut mutator: F) -> Request<usize>
    where
        F: FnMut(&mut Record) + Send + 'static,
    {
        self.run_mutation(Mutation::Apply(Box::new(move |record: &mut Record| -> HookResult<()> {
            mutator(record);
            Ok(())
        })))
    }

    /// Like [`Collection::modify`], with a callback that may fail.
    ///
    /// A callback error fails the operation with
    /// [`CoreError::MutatorFailed`](crate::CoreError::MutatorFailed).
    pub fn try_modify<F>(self, mutator: F) -> Request<usize>
    where
        F: FnMut(&mut Record) -> HookResult<()> + Send + 'static,
    {
        self.run_mutation(Mutation::Apply(Box::new(mutator)))
    }

    /// Applies a fixed descriptor to every matching record.
    pub fn modify_with(self, changes: Modifications) -> Request<usize> {
        self.run_mutation(Mutation::Changes(changes))
    }

    /// Applies the descriptor `describe` returns for each matching record.
    ///
    /// `None` leaves the record as it is; it still counts as a match.
    pub fn modify_map<F>(self, mut describe: F) -> Request<usize>
    where
        F: FnMut(&Record) -> Option<Modifications> + Send + 'static,
    {
        self.run_mutation(Mutation::Describe(Box::new(
            move |record: &Record| -> HookResult<Option<Modifications>> { Ok(describe(record)) },
        )))
    }

    /// Like [`Collection::try_modify`], with a callback that may suspend.
    ///
    /// The callback owns the reading view and resolves to the edited record.
    /// The operation keeps its place in the transaction while the callback is
    /// pending, so awaiting another operation of the same transaction from
    /// inside it never resolves.
    pub fn modify_async<F, Fut>(self, mut mutator: F) -> Request<usize>
    where
        F: FnMut(Record) -> Fut + Send + 'static,
        Fut: Future<Output = HookResult<Record>> + Send + 'static,
    {
        self.run_mutation(Mutation::Await(Box::new(move |record: Record| -> MutatorFuture {
            Box::pin(mutator(record))
        })))
    }

    /// Deletes every matching record. Resolves to the number deleted.
    pub fn delete(self) -> Request<usize> {
        let Collection {
            table,
            query,
            filters,
            limit,
        } = self;
        table.schedule(AccessMode::ReadWrite, move |scope| async move {
            scope.delete_matches(&query, &filters, limit).await
        })
    }

    fn run_mutation(self, mutation: Mutation) -> Request<usize> {
        let Collection {
            table,
            query,
            filters,
            limit,
        } = self;
        table.schedule(AccessMode::ReadWrite, move |scope| async move {
            scope.modify_matches(&query, &filters, limit, mutation).await
        })
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("table", &self.table.name())
            .field("query", &self.query)
            .field("filters", &self.filters.len())
            .field("limit", &self.limit)
            .finish()
    }
}
