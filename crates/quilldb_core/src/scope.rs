//! Per-operation access to one table inside one transaction.

use crate::config::Config;
use crate::error::CoreResult;
use crate::hooks::{HookEvent, TableHooks};
use crate::keys::resolve_key;
use quilldb_codec::{Key, Record};
use quilldb_storage::{RecordStore, StoreTxn, TableSchema, WriteMode};
use std::sync::Arc;
use tracing::trace;

/// Everything an operation needs to touch one table: the store, the store
/// transaction, the table's schema and hooks.
#[derive(Clone)]
pub(crate) struct TableScope {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) txn: StoreTxn,
    pub(crate) table: String,
    pub(crate) schema: Arc<TableSchema>,
    pub(crate) hooks: Arc<TableHooks>,
    pub(crate) config: Config,
}

impl TableScope {
    /// Reads a record as stored, without the `reading` hooks.
    pub(crate) fn raw(&self, key: &Key) -> CoreResult<Option<Record>> {
        Ok(self.store.get(self.txn, &self.table, key)?)
    }

    /// Creates a record through the `creating` and `writing` hooks.
    ///
    /// `mode` decides whether an existing record under the same key is a
    /// constraint violation (`add`) or is overwritten (`put`).
    pub(crate) fn create(
        &self,
        supplied: Option<Key>,
        mut record: Record,
        mode: WriteMode,
    ) -> CoreResult<Key> {
        let resolved = resolve_key(&self.schema, supplied, &mut record)?;
        self.hooks
            .dispatch_creating(resolved.key.as_ref(), &mut record)?;
        let record = self.hooks.dispatch_writing(record)?;
        let key = self
            .store
            .put(self.txn, &self.table, resolved.store_key(), record, mode)?;
        trace!(table = %self.table, %key, source = ?resolved.source, "record staged");
        Ok(key)
    }

    /// Deletes a record through the `deleting` hooks.
    pub(crate) fn remove(&self, key: &Key) -> CoreResult<bool> {
        if self.hooks.has(HookEvent::Deleting) {
            match self.raw(key)? {
                Some(record) => self.remove_loaded(key, &record),
                None => Ok(false),
            }
        } else {
            Ok(self.store.delete(self.txn, &self.table, key)?)
        }
    }

    /// Deletes a record that was already read.
    pub(crate) fn remove_loaded(&self, key: &Key, record: &Record) -> CoreResult<bool> {
        self.hooks.dispatch_deleting(key, record)?;
        Ok(self.store.delete(self.txn, &self.table, key)?)
    }

    /// Called between chunks of a batched operation.
    pub(crate) async fn pause(&self, processed: usize) {
        trace!(table = %self.table, processed, "batch boundary");
        if self.config.yield_between_chunks {
            tokio::task::yield_now().await;
        }
    }

    /// Returns true if item `index` starts a new chunk.
    pub(crate) fn at_boundary(&self, index: usize) -> bool {
        index > 0 && index % self.config.effective_chunk_size() == 0
    }
}
