//! Table handles.

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::hooks::TableHooks;
use crate::mutation::Modifications;
use crate::query::{Collection, WhereClause};
use crate::request::Request;
use crate::scope::TableScope;
use crate::transaction::manager;
use crate::transaction::Transaction;
use quilldb_codec::{Key, Record};
use quilldb_storage::{AccessMode, IndexQuery, StoreTxn, TableSchema, WriteMode};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A handle to one table.
///
/// A table obtained from [`Database::table`] is unbound: each operation
/// runs in its own implicit transaction that commits when the operation
/// finishes. A table obtained from [`Transaction::table`] is bound: its
/// operations queue into that transaction.
///
/// Every operation returns a [`Request`] and starts immediately.
#[derive(Clone)]
pub struct Table {
    /// Owning database.
    db: Database,
    /// Table name.
    name: String,
    /// Schema the table was created with.
    schema: Arc<TableSchema>,
    /// Lifecycle hooks, shared by every handle to this table.
    hooks: Arc<TableHooks>,
    /// Bound transaction, if any.
    txn: Option<Transaction>,
}

impl Table {
    pub(crate) fn new(db: Database, schema: Arc<TableSchema>, hooks: Arc<TableHooks>) -> Self {
        Self {
            db,
            name: schema.name.clone(),
            schema,
            hooks,
            txn: None,
        }
    }

    pub(crate) fn bind(mut self, txn: Transaction) -> Self {
        self.txn = Some(txn);
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table schema.
    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Returns the table's hook registry.
    ///
    /// Hooks are shared by every handle to the table, bound or not.
    #[must_use]
    pub fn hook(&self) -> &TableHooks {
        &self.hooks
    }

    /// Returns the bound transaction.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction> {
        self.txn.as_ref()
    }

    /// Inserts a record. The key comes from the record's inline key path or
    /// the key generator.
    ///
    /// Fails with [`CoreError::Constraint`] if the key exists.
    pub fn add(&self, record: Record) -> Request<Key> {
        self.create(None, record, WriteMode::Insert)
    }

    /// Inserts a record under an explicit key.
    ///
    /// Every key is explicit here, including `0`, `""` and `false`.
    pub fn add_with_key(&self, record: Record, key: impl Into<Key>) -> Request<Key> {
        self.create(Some(key.into()), record, WriteMode::Insert)
    }

    /// Inserts or replaces a record.
    pub fn put(&self, record: Record) -> Request<Key> {
        self.create(None, record, WriteMode::Upsert)
    }

    /// Inserts or replaces the record under an explicit key.
    pub fn put_with_key(&self, record: Record, key: impl Into<Key>) -> Request<Key> {
        self.create(Some(key.into()), record, WriteMode::Upsert)
    }

    /// Inserts several records. Returns their keys in input order.
    pub fn bulk_add(&self, records: impl IntoIterator<Item = Record>) -> Request<Vec<Key>> {
        self.bulk_create(records.into_iter().collect(), WriteMode::Insert)
    }

    /// Inserts or replaces several records. Returns their keys in input order.
    pub fn bulk_put(&self, records: impl IntoIterator<Item = Record>) -> Request<Vec<Key>> {
        self.bulk_create(records.into_iter().collect(), WriteMode::Upsert)
    }

    /// Reads a record through the `reading` hooks.
    pub fn get(&self, key: impl Into<Key>) -> Request<Option<Record>> {
        let key = key.into();
        self.schedule(AccessMode::ReadOnly, move |scope| async move {
            scope.read(&key)
        })
    }

    /// Applies changes to one record.
    ///
    /// Resolves to 1 if the record was updated and 0 if no record has the
    /// key.
    pub fn update(&self, key: impl Into<Key>, changes: Modifications) -> Request<usize> {
        let key = key.into();
        self.schedule(AccessMode::ReadWrite, move |scope| async move {
            scope.update_one(&key, &changes)
        })
    }

    /// Deletes a record. Resolves to false if no record had the key.
    pub fn delete(&self, key: impl Into<Key>) -> Request<bool> {
        let key = key.into();
        self.schedule(AccessMode::ReadWrite, move |scope| async move {
            scope.remove(&key)
        })
    }

    /// Deletes several records. Resolves to the number deleted.
    pub fn bulk_delete<K: Into<Key>>(&self, keys: impl IntoIterator<Item = K>) -> Request<usize> {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.schedule(AccessMode::ReadWrite, move |scope| async move {
            let mut deleted = 0;
            for (i, key) in keys.iter().enumerate() {
                if scope.at_boundary(i) {
                    scope.pause(i).await;
                }
                if scope.remove(key)? {
                    deleted += 1;
                }
            }
            Ok(deleted)
        })
    }

    /// Deletes every record. Resolves to the number deleted.
    pub fn clear(&self) -> Request<usize> {
        self.to_collection().delete()
    }

    /// Counts the records.
    pub fn count(&self) -> Request<usize> {
        self.to_collection().count()
    }

    /// Reads every record in primary key order.
    pub fn to_array(&self) -> Request<Vec<Record>> {
        self.to_collection().to_array()
    }

    /// Calls `f` with every record in primary key order.
    pub fn each<F>(&self, f: F) -> Request<()>
    where
        F: FnMut(Record) + Send + 'static,
    {
        self.to_collection().each(f)
    }

    /// Returns a collection of every record.
    #[must_use]
    pub fn to_collection(&self) -> Collection {
        Collection::new(self.clone(), IndexQuery::all())
    }

    /// Starts a query on a field.
    ///
    /// The inline primary key path queries the primary key; any other name
    /// must be an index.
    #[must_use]
    pub fn where_field(&self, field: &str) -> WhereClause {
        if self.schema.is_primary_path(field) {
            self.where_key()
        } else {
            WhereClause::new(self.clone(), Some(field.to_string()))
        }
    }

    /// Starts a query on the primary key.
    #[must_use]
    pub fn where_key(&self) -> WhereClause {
        WhereClause::new(self.clone(), None)
    }

    /// Returns a collection of the records accepted by `predicate`.
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Collection
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.to_collection().filter(predicate)
    }

    fn create(&self, key: Option<Key>, record: Record, mode: WriteMode) -> Request<Key> {
        self.schedule(AccessMode::ReadWrite, move |scope| async move {
            scope.create(key, record, mode)
        })
    }

    fn bulk_create(&self, records: Vec<Record>, mode: WriteMode) -> Request<Vec<Key>> {
        self.schedule(AccessMode::ReadWrite, move |scope| async move {
            let mut keys = Vec::with_capacity(records.len());
            for (i, record) in records.into_iter().enumerate() {
                if scope.at_boundary(i) {
                    scope.pause(i).await;
                }
                keys.push(scope.create(None, record, mode)?);
            }
            Ok(keys)
        })
    }

    fn scope(&self, txn: StoreTxn) -> TableScope {
        TableScope {
            store: Arc::clone(self.db.store()),
            txn,
            table: self.name.clone(),
            schema: Arc::clone(&self.schema),
            hooks: Arc::clone(&self.hooks),
            config: self.db.config().clone(),
        }
    }

    /// Issues an operation on this table.
    ///
    /// On a bound table the operation queues into the transaction. On an
    /// unbound table it runs in an implicit transaction of its own; a
    /// failure is then reported as its cause, not as an abort.
    pub(crate) fn schedule<T, F, Fut>(&self, mode: AccessMode, op: F) -> Request<T>
    where
        T: Send + 'static,
        F: FnOnce(TableScope) -> Fut + Send + 'static,
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
    {
        let table = self.clone();
        let run = move |store_txn: StoreTxn| op(table.scope(store_txn));
        let name = self.name.clone();

        if let Some(txn) = &self.txn {
            let txn = txn.clone();
            let ticket = txn.issue();
            return Request::spawn(async move { txn.run_op(ticket, &name, mode, run).await });
        }

        if !self.db.config().implicit_transactions {
            return Request::failed(CoreError::NoTransaction { table: name });
        }
        let txn = match manager::begin(&self.db, mode, vec![name.clone()]) {
            Ok(txn) => txn,
            Err(err) => return Request::failed(err),
        };
        let ticket = txn.issue();
        Request::spawn(async move {
            let outcome = txn.run_op(ticket, &name, mode, run).await;
            txn.complete(outcome).await.map_err(CoreError::into_cause)
        })
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("txn", &self.txn.as_ref().map(Transaction::id))
            .finish()
    }
}
