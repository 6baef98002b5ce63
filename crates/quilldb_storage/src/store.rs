//! The record store contract.

use crate::error::StorageResult;
use crate::query::IndexQuery;
use crate::schema::TableSchema;
use quilldb_codec::{Key, Record};
use std::fmt;

/// Handle to an open store transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreTxn(u64);

impl StoreTxn {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreTxn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreTxn({})", self.0)
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Reads only.
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

impl AccessMode {
    /// Returns true if a transaction in this mode may host work that needs `other`.
    pub fn covers(self, other: AccessMode) -> bool {
        self == AccessMode::ReadWrite || other == AccessMode::ReadOnly
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadOnly => f.write_str("readonly"),
            AccessMode::ReadWrite => f.write_str("readwrite"),
        }
    }
}

/// How `put` treats an existing record under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with a constraint error if the key exists.
    Insert,
    /// Overwrite any existing record.
    Upsert,
}

/// A transactional record store.
///
/// Records are addressed by table and primary key and maintained under the
/// table's secondary indexes. Every operation runs against a transaction
/// handle obtained from [`RecordStore::begin`]; reads observe the handle's own
/// staged writes, and nothing becomes visible to other handles before
/// [`RecordStore::commit`].
///
/// # Invariants
///
/// - Primary keys are unique within a table.
/// - Unique indexes hold at most one primary key per index key.
/// - `commit` is all-or-nothing.
/// - Implementations must be `Send + Sync`.
pub trait RecordStore: Send + Sync {
    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Fails if the schema is invalid or the table exists.
    fn create_table(&self, schema: TableSchema) -> StorageResult<()>;

    /// Returns the schema of a table.
    fn schema(&self, table: &str) -> StorageResult<TableSchema>;

    /// Returns the names of all tables.
    fn table_names(&self) -> Vec<String>;

    /// Opens a transaction over the given tables.
    ///
    /// # Errors
    ///
    /// Fails if a table does not exist.
    fn begin(&self, mode: AccessMode, tables: &[String]) -> StorageResult<StoreTxn>;

    /// Reads a record.
    fn get(&self, txn: StoreTxn, table: &str, key: &Key) -> StorageResult<Option<Record>>;

    /// Stages a record write and returns its primary key.
    ///
    /// A `None` key asks the store to derive one: from the inline key path
    /// if the record carries it, else from the table's key generator.
    ///
    /// # Errors
    ///
    /// Fails with a constraint error when `mode` is [`WriteMode::Insert`] and
    /// the key exists, or when a unique index would be violated.
    fn put(
        &self,
        txn: StoreTxn,
        table: &str,
        key: Option<Key>,
        record: Record,
        mode: WriteMode,
    ) -> StorageResult<Key>;

    /// Stages a delete. Returns true if a record existed.
    fn delete(&self, txn: StoreTxn, table: &str, key: &Key) -> StorageResult<bool>;

    /// Returns the primary keys matching a query, in index order.
    fn scan(&self, txn: StoreTxn, table: &str, query: &IndexQuery) -> StorageResult<Vec<Key>>;

    /// Counts the records matching a query.
    fn count(&self, txn: StoreTxn, table: &str, query: &IndexQuery) -> StorageResult<usize> {
        self.scan(txn, table, query).map(|keys| keys.len())
    }

    /// Commits a transaction and returns the resulting commit sequence.
    ///
    /// # Errors
    ///
    /// Fails with a conflict if a record read by the transaction changed in
    /// the meantime, or with a constraint error if a staged write collides
    /// with a record committed by another transaction. The transaction is
    /// discarded either way.
    fn commit(&self, txn: StoreTxn) -> StorageResult<u64>;

    /// Discards a transaction's staged writes.
    fn abort(&self, txn: StoreTxn) -> StorageResult<()>;

    /// Returns the sequence number of the latest commit.
    fn committed_sequence(&self) -> u64;
}
