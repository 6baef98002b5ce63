//! Per-transaction staged state.

use crate::error::{StorageError, StorageResult};
use crate::store::AccessMode;
use quilldb_codec::Key;
use std::collections::{BTreeMap, HashMap};

/// A write staged by an open transaction.
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    /// Put of an encoded record.
    Put {
        /// Canonical CBOR bytes.
        bytes: Vec<u8>,
        /// Index keys per index name.
        index_keys: HashMap<String, Vec<Key>>,
        /// The key must still be absent from committed state at commit.
        insert: bool,
    },
    /// Delete of the committed record.
    Delete,
}

/// What a transaction has already staged for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prior {
    /// Nothing staged; the committed state applies.
    Untouched,
    /// A put is staged.
    Put {
        /// Insert flag of the staged put.
        insert: bool,
    },
    /// A delete is staged.
    Deleted,
}

/// Writes and read versions of one open transaction.
#[derive(Debug)]
pub(crate) struct StagedTxn {
    pub(crate) mode: AccessMode,
    pub(crate) tables: Vec<String>,
    pub(crate) writes: HashMap<String, BTreeMap<Key, StagedWrite>>,
    /// Committed version observed for each key read, `None` if it was absent.
    pub(crate) reads: HashMap<(String, Key), Option<u64>>,
}

impl StagedTxn {
    pub(crate) fn new(mode: AccessMode, tables: Vec<String>) -> Self {
        Self {
            mode,
            tables,
            writes: HashMap::new(),
            reads: HashMap::new(),
        }
    }

    pub(crate) fn check_scope(&self, table: &str) -> StorageResult<()> {
        if self.tables.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(StorageError::TableOutOfScope {
                table: table.to_string(),
            })
        }
    }

    pub(crate) fn check_writable(&self, table: &str) -> StorageResult<()> {
        self.check_scope(table)?;
        match self.mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(StorageError::ReadOnly {
                table: table.to_string(),
            }),
        }
    }

    pub(crate) fn staged(&self, table: &str, key: &Key) -> Option<&StagedWrite> {
        self.writes.get(table).and_then(|w| w.get(key))
    }

    pub(crate) fn prior(&self, table: &str, key: &Key) -> Prior {
        match self.staged(table, key) {
            None => Prior::Untouched,
            Some(StagedWrite::Put { insert, .. }) => Prior::Put { insert: *insert },
            Some(StagedWrite::Delete) => Prior::Deleted,
        }
    }

    pub(crate) fn table_writes(&self, table: &str) -> impl Iterator<Item = (&Key, &StagedWrite)> {
        self.writes.get(table).into_iter().flatten()
    }

    pub(crate) fn stage(&mut self, table: &str, key: Key, write: StagedWrite) {
        self.writes
            .entry(table.to_string())
            .or_default()
            .insert(key, write);
    }

    pub(crate) fn unstage(&mut self, table: &str, key: &Key) {
        if let Some(writes) = self.writes.get_mut(table) {
            writes.remove(key);
        }
    }

    /// Records the committed version of a key the first time it is read.
    ///
    /// Keys this transaction already wrote are not tracked: their value
    /// comes from the transaction itself.
    pub(crate) fn record_read(&mut self, table: &str, key: &Key, version: Option<u64>) {
        if self.mode == AccessMode::ReadOnly || self.staged(table, key).is_some() {
            return;
        }
        self.reads
            .entry((table.to_string(), key.clone()))
            .or_insert(version);
    }

    pub(crate) fn has_writes(&self) -> bool {
        self.writes.values().any(|w| !w.is_empty())
    }
}
