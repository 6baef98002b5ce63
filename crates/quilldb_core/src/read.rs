//! Read pipeline.
//!
//! Every record handed to a caller, whether by `get`, `to_array`, `each` or
//! as the input of a `modify` callback, passes through the table's `reading`
//! hooks exactly once. Stored records are never changed by reading.

use crate::error::CoreResult;
use crate::scope::TableScope;
use quilldb_codec::{Key, Record};
use quilldb_storage::IndexQuery;
use std::sync::Arc;

/// A predicate over the reading view of a record.
pub(crate) type RecordFilter = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// One record produced by [`TableScope::walk`].
pub(crate) struct Match {
    pub(crate) key: Key,
    /// The record as stored.
    pub(crate) raw: Record,
    /// The record as the `reading` hooks present it.
    pub(crate) view: Record,
}

impl TableScope {
    /// Reads one record through the `reading` hooks.
    pub(crate) fn read(&self, key: &Key) -> CoreResult<Option<Record>> {
        match self.raw(key)? {
            Some(record) => Ok(Some(self.hooks.dispatch_reading(record)?)),
            None => Ok(None),
        }
    }

    /// Visits the records matching `query` in index order.
    ///
    /// Matching keys are collected up front, so `visit` may write to the
    /// table. Records are loaded and visited in chunks of
    /// [`Config::chunk_size`](crate::Config::chunk_size) with a scheduler
    /// yield in between. `filters` see the reading view; `limit` caps the
    /// number of visited records. Returns that number.
    pub(crate) async fn walk<F>(
        &self,
        query: &IndexQuery,
        filters: &[RecordFilter],
        limit: Option<usize>,
        mut visit: F,
    ) -> CoreResult<usize>
    where
        F: FnMut(Match) -> CoreResult<()>,
    {
        let keys = self.store.scan(self.txn, &self.table, query)?;
        let mut visited = 0;
        for (i, key) in keys.into_iter().enumerate() {
            if limit.is_some_and(|max| visited >= max) {
                break;
            }
            if self.at_boundary(i) {
                self.pause(i).await;
            }
            let Some(found) = self.load_match(key, filters)? else {
                continue;
            };
            visited += 1;
            visit(found)?;
        }
        Ok(visited)
    }

    /// Loads one scanned key. Returns `None` if the record is gone or a
    /// filter rejects its reading view.
    pub(crate) fn load_match(&self, key: Key, filters: &[RecordFilter]) -> CoreResult<Option<Match>> {
        let Some(raw) = self.raw(&key)? else {
            return Ok(None);
        };
        let view = self.hooks.dispatch_reading(raw.clone())?;
        if !filters.iter().all(|keep| keep(&view)) {
            return Ok(None);
        }
        Ok(Some(Match { key, raw, view }))
    }
}
