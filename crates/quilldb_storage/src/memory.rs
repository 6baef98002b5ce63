//! In-memory record store.

use crate::error::{StorageError, StorageResult};
use crate::index::SecondaryIndex;
use crate::query::IndexQuery;
use crate::schema::TableSchema;
use crate::staging::{Prior, StagedTxn, StagedWrite};
use crate::store::{AccessMode, RecordStore, StoreTxn, WriteMode};
use parking_lot::{Mutex, RwLock};
use quilldb_codec::{decode_record, encode_record, Key, Record};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct StoredRow {
    bytes: Vec<u8>,
    /// Sequence number of the commit that wrote this row.
    version: u64,
    index_keys: HashMap<String, Vec<Key>>,
}

#[derive(Debug)]
struct TableData {
    schema: TableSchema,
    rows: BTreeMap<Key, StoredRow>,
    indexes: HashMap<String, SecondaryIndex>,
    /// Highest integer key generated or written. Not rolled back on abort.
    auto_counter: i64,
}

impl TableData {
    fn new(schema: TableSchema) -> Self {
        let indexes = schema
            .indexes
            .iter()
            .map(|spec| (spec.name.clone(), SecondaryIndex::new(spec.clone())))
            .collect();
        Self {
            schema,
            rows: BTreeMap::new(),
            indexes,
            auto_counter: 0,
        }
    }

    fn index_keys(&self, record: &Record) -> HashMap<String, Vec<Key>> {
        self.schema
            .indexes
            .iter()
            .map(|spec| (spec.name.clone(), spec.keys_for(record)))
            .collect()
    }

    fn remove_row(&mut self, key: &Key) {
        let Some(row) = self.rows.remove(key) else {
            return;
        };
        for (name, index_keys) in &row.index_keys {
            if let Some(index) = self.indexes.get_mut(name) {
                for ik in index_keys {
                    index.remove(ik, key);
                }
            }
        }
    }

    fn insert_row(&mut self, key: Key, row: StoredRow) {
        for (name, index_keys) in &row.index_keys {
            if let Some(index) = self.indexes.get_mut(name) {
                for ik in index_keys {
                    index.insert(ik.clone(), key.clone());
                }
            }
        }
        self.rows.insert(key, row);
    }

    /// Determines the primary key of a record being written and stores it
    /// at the inline key path.
    fn assign_key(&mut self, key: Option<Key>, record: &mut Record) -> StorageResult<Key> {
        let pk = &self.schema.primary_key;
        let key = match key {
            Some(key) => key,
            None => match pk.path.as_ref().and_then(|p| p.extract(record)) {
                Some(key) => key,
                None if pk.auto_increment => {
                    let next = self.auto_counter.checked_add(1).ok_or_else(|| {
                        StorageError::constraint(&self.schema.name, "key generator exhausted")
                    })?;
                    self.auto_counter = next;
                    Key::Integer(next)
                }
                None => {
                    return Err(StorageError::MissingKey {
                        table: self.schema.name.clone(),
                    })
                }
            },
        };
        if pk.auto_increment {
            if let Key::Integer(n) = key {
                self.auto_counter = self.auto_counter.max(n);
            }
        }
        if let Some(path) = &pk.path {
            path.assign(record, &key)?;
        }
        Ok(key)
    }

    /// Checks a staged record's unique index keys against committed rows
    /// and against the transaction's other staged puts.
    fn check_unique(
        &self,
        staged: &StagedTxn,
        key: &Key,
        index_keys: &HashMap<String, Vec<Key>>,
    ) -> StorageResult<()> {
        let table = self.schema.name.as_str();
        for spec in self.schema.indexes.iter().filter(|i| i.unique) {
            for ik in index_keys.get(&spec.name).into_iter().flatten() {
                let committed = self
                    .indexes
                    .get(&spec.name)
                    .into_iter()
                    .flat_map(|index| index.owners(ik))
                    .any(|owner| owner != key && staged.staged(table, owner).is_none());
                let pending = staged.table_writes(table).any(|(pk, write)| {
                    pk != key
                        && matches!(write, StagedWrite::Put { index_keys: other, .. }
                            if other.get(&spec.name).is_some_and(|ks| ks.contains(ik)))
                });
                if committed || pending {
                    return Err(StorageError::constraint(
                        table,
                        format!("unique index '{}' already contains {ik}", spec.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, TableData>,
    sequence: u64,
}

impl StoreState {
    fn table(&self, name: &str) -> StorageResult<&TableData> {
        self.tables.get(name).ok_or_else(|| StorageError::UnknownTable {
            table: name.to_string(),
        })
    }

    fn table_mut(&mut self, name: &str) -> StorageResult<&mut TableData> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StorageError::UnknownTable {
                table: name.to_string(),
            })
    }

    /// Validates a transaction against the current committed state.
    fn validate(&self, staged: &StagedTxn) -> StorageResult<()> {
        for ((table, key), seen) in &staged.reads {
            let current = self
                .tables
                .get(table)
                .and_then(|data| data.rows.get(key))
                .map(|row| row.version);
            if current != *seen {
                return Err(StorageError::Conflict {
                    table: table.clone(),
                    key: key.to_string(),
                });
            }
        }

        for (table, writes) in &staged.writes {
            let data = self.table(table)?;
            for (key, write) in writes {
                let StagedWrite::Put {
                    index_keys, insert, ..
                } = write
                else {
                    continue;
                };
                if *insert && data.rows.contains_key(key) {
                    return Err(StorageError::constraint(
                        table,
                        format!("key {key} already exists"),
                    ));
                }
                for spec in data.schema.indexes.iter().filter(|i| i.unique) {
                    for ik in index_keys.get(&spec.name).into_iter().flatten() {
                        let clash = data
                            .indexes
                            .get(&spec.name)
                            .into_iter()
                            .flat_map(|index| index.owners(ik))
                            .any(|owner| owner != key && !writes.contains_key(owner));
                        if clash {
                            return Err(StorageError::constraint(
                                table,
                                format!("unique index '{}' already contains {ik}", spec.name),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// An in-memory [`RecordStore`].
///
/// Committed rows are held as canonical CBOR bytes together with their
/// index keys and the sequence number of the commit that wrote them.
/// Each open transaction stages its writes privately; `commit` validates
/// the transaction's read set and constraints against the committed state
/// and then applies every staged write under one lock.
///
/// # Example
///
/// ```rust
/// use quilldb_codec::{record, Key};
/// use quilldb_storage::{AccessMode, MemoryStore, RecordStore, TableSchema, WriteMode};
///
/// let store = MemoryStore::new();
/// store.create_table(TableSchema::parse("friends", "++id, name").unwrap()).unwrap();
///
/// let txn = store.begin(AccessMode::ReadWrite, &["friends".to_string()]).unwrap();
/// let key = store
///     .put(txn, "friends", None, record! { "name" => "Arnold" }, WriteMode::Insert)
///     .unwrap();
/// assert_eq!(key, Key::Integer(1));
/// store.commit(txn).unwrap();
/// assert_eq!(store.len("friends").unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    txns: Mutex<HashMap<StoreTxn, StagedTxn>>,
    next_txn: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given tables.
    ///
    /// # Errors
    ///
    /// Fails if a schema is invalid or two schemas share a name.
    pub fn with_tables(schemas: impl IntoIterator<Item = TableSchema>) -> StorageResult<Self> {
        let store = Self::new();
        for schema in schemas {
            store.create_table(schema)?;
        }
        Ok(store)
    }

    /// Returns the number of committed records in a table.
    pub fn len(&self, table: &str) -> StorageResult<usize> {
        Ok(self.state.read().table(table)?.rows.len())
    }

    /// Returns the number of open transactions.
    pub fn open_transactions(&self) -> usize {
        self.txns.lock().len()
    }

    fn staged_mut(
        txns: &mut HashMap<StoreTxn, StagedTxn>,
        txn: StoreTxn,
    ) -> StorageResult<&mut StagedTxn> {
        txns.get_mut(&txn)
            .ok_or(StorageError::TransactionNotFound { txn: txn.as_u64() })
    }
}

impl RecordStore for MemoryStore {
    fn create_table(&self, schema: TableSchema) -> StorageResult<()> {
        schema.validate()?;
        let mut state = self.state.write();
        if state.tables.contains_key(&schema.name) {
            return Err(StorageError::TableExists { table: schema.name });
        }
        debug!(table = %schema.name, indexes = schema.indexes.len(), "created table");
        state.tables.insert(schema.name.clone(), TableData::new(schema));
        Ok(())
    }

    fn schema(&self, table: &str) -> StorageResult<TableSchema> {
        Ok(self.state.read().table(table)?.schema.clone())
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().tables.keys().cloned().collect();
        names.sort();
        names
    }

    fn begin(&self, mode: AccessMode, tables: &[String]) -> StorageResult<StoreTxn> {
        {
            let state = self.state.read();
            for table in tables {
                state.table(table)?;
            }
        }
        let txn = StoreTxn::from_raw(self.next_txn.fetch_add(1, Ordering::Relaxed) + 1);
        self.txns
            .lock()
            .insert(txn, StagedTxn::new(mode, tables.to_vec()));
        trace!(%txn, %mode, ?tables, "store transaction opened");
        Ok(txn)
    }

    fn get(&self, txn: StoreTxn, table: &str, key: &Key) -> StorageResult<Option<Record>> {
        let mut txns = self.txns.lock();
        let staged = Self::staged_mut(&mut txns, txn)?;
        staged.check_scope(table)?;
        match staged.staged(table, key) {
            Some(StagedWrite::Put { bytes, .. }) => return Ok(Some(decode_record(bytes)?)),
            Some(StagedWrite::Delete) => return Ok(None),
            None => {}
        }

        let state = self.state.read();
        let row = state.table(table)?.rows.get(key);
        staged.record_read(table, key, row.map(|r| r.version));
        match row {
            Some(row) => Ok(Some(decode_record(&row.bytes)?)),
            None => Ok(None),
        }
    }

    fn put(
        &self,
        txn: StoreTxn,
        table: &str,
        key: Option<Key>,
        mut record: Record,
        mode: WriteMode,
    ) -> StorageResult<Key> {
        let mut txns = self.txns.lock();
        let staged = Self::staged_mut(&mut txns, txn)?;
        staged.check_writable(table)?;

        let mut state = self.state.write();
        let data = state.table_mut(table)?;
        let key = data.assign_key(key, &mut record)?;
        let bytes = encode_record(&record)?;
        let index_keys = data.index_keys(&record);

        let (exists, insert) = match staged.prior(table, &key) {
            Prior::Put { insert } => (true, insert),
            Prior::Deleted => (false, false),
            Prior::Untouched => (data.rows.contains_key(&key), mode == WriteMode::Insert),
        };
        if mode == WriteMode::Insert && exists {
            return Err(StorageError::constraint(
                table,
                format!("key {key} already exists"),
            ));
        }
        data.check_unique(staged, &key, &index_keys)?;

        staged.stage(
            table,
            key.clone(),
            StagedWrite::Put {
                bytes,
                index_keys,
                insert,
            },
        );
        Ok(key)
    }

    fn delete(&self, txn: StoreTxn, table: &str, key: &Key) -> StorageResult<bool> {
        let mut txns = self.txns.lock();
        let staged = Self::staged_mut(&mut txns, txn)?;
        staged.check_writable(table)?;

        let existed = match staged.prior(table, key) {
            Prior::Put { insert: true } => {
                staged.unstage(table, key);
                return Ok(true);
            }
            Prior::Put { insert: false } => true,
            Prior::Deleted => false,
            Prior::Untouched => {
                let state = self.state.read();
                let row = state.table(table)?.rows.get(key);
                staged.record_read(table, key, row.map(|r| r.version));
                row.is_some()
            }
        };
        if existed {
            staged.stage(table, key.clone(), StagedWrite::Delete);
        }
        Ok(existed)
    }

    fn scan(&self, txn: StoreTxn, table: &str, query: &IndexQuery) -> StorageResult<Vec<Key>> {
        let txns = self.txns.lock();
        let staged = txns
            .get(&txn)
            .ok_or(StorageError::TransactionNotFound { txn: txn.as_u64() })?;
        staged.check_scope(table)?;

        let state = self.state.read();
        let data = state.table(table)?;
        let mut hits: Vec<(Key, Key)> = match &query.index {
            None => query
                .predicate
                .select(&data.rows)
                .into_iter()
                .map(|(pk, _)| (pk.clone(), pk.clone()))
                .collect(),
            Some(name) => data
                .indexes
                .get(name)
                .ok_or_else(|| StorageError::UnknownIndex {
                    table: table.to_string(),
                    index: name.clone(),
                })?
                .select(&query.predicate),
        };
        hits.retain(|(_, pk)| staged.staged(table, pk).is_none());

        for (pk, write) in staged.table_writes(table) {
            let StagedWrite::Put { index_keys, .. } = write else {
                continue;
            };
            match &query.index {
                None if query.predicate.matches(pk) => hits.push((pk.clone(), pk.clone())),
                None => {}
                Some(name) => hits.extend(
                    index_keys
                        .get(name)
                        .into_iter()
                        .flatten()
                        .filter(|ik| query.predicate.matches(ik))
                        .map(|ik| (ik.clone(), pk.clone())),
                ),
            }
        }

        hits.sort();
        let mut seen = HashSet::new();
        Ok(hits
            .into_iter()
            .filter_map(|(_, pk)| seen.insert(pk.clone()).then_some(pk))
            .collect())
    }

    fn commit(&self, txn: StoreTxn) -> StorageResult<u64> {
        let staged = self
            .txns
            .lock()
            .remove(&txn)
            .ok_or(StorageError::TransactionNotFound { txn: txn.as_u64() })?;

        if !staged.has_writes() {
            let sequence = self.state.read().sequence;
            trace!(%txn, sequence, "store transaction closed without writes");
            return Ok(sequence);
        }

        let mut state = self.state.write();
        state.validate(&staged)?;
        state.sequence += 1;
        let sequence = state.sequence;
        let mut applied = 0usize;
        for (table, writes) in staged.writes {
            let data = state.table_mut(&table)?;
            for (key, write) in writes {
                data.remove_row(&key);
                if let StagedWrite::Put {
                    bytes, index_keys, ..
                } = write
                {
                    data.insert_row(
                        key,
                        StoredRow {
                            bytes,
                            version: sequence,
                            index_keys,
                        },
                    );
                }
                applied += 1;
            }
        }
        debug!(%txn, sequence, writes = applied, "store transaction committed");
        Ok(sequence)
    }

    fn abort(&self, txn: StoreTxn) -> StorageResult<()> {
        self.txns
            .lock()
            .remove(&txn)
            .ok_or(StorageError::TransactionNotFound { txn: txn.as_u64() })?;
        trace!(%txn, "store transaction aborted");
        Ok(())
    }

    fn committed_sequence(&self) -> u64 {
        self.state.read().sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use quilldb_codec::{record, Value};

    fn store() -> MemoryStore {
        MemoryStore::with_tables([
            TableSchema::parse("friends", "++id, name, &email, *tags").unwrap(),
            TableSchema::parse("blobs", "").unwrap(),
        ])
        .unwrap()
    }

    fn rw(store: &MemoryStore, table: &str) -> StoreTxn {
        store
            .begin(AccessMode::ReadWrite, &[table.to_string()])
            .unwrap()
    }

    fn names(store: &MemoryStore, txn: StoreTxn, keys: &[Key]) -> Vec<String> {
        keys.iter()
            .map(|k| {
                let rec = store.get(txn, "friends", k).unwrap().unwrap();
                rec.get("name").unwrap().as_text().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn auto_increment_writes_inline_key() {
        let store = store();
        let txn = rw(&store, "friends");
        let k1 = store
            .put(txn, "friends", None, record! { "name" => "a" }, WriteMode::Insert)
            .unwrap();
        let k2 = store
            .put(txn, "friends", None, record! { "name" => "b" }, WriteMode::Insert)
            .unwrap();
        assert_eq!((k1.clone(), k2), (Key::Integer(1), Key::Integer(2)));
        let rec = store.get(txn, "friends", &k1).unwrap().unwrap();
        assert_eq!(rec.get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn explicit_integer_key_advances_generator() {
        let store = store();
        let txn = rw(&store, "friends");
        store
            .put(txn, "friends", Some(Key::Integer(10)), record! { "name" => "a" }, WriteMode::Insert)
            .unwrap();
        let next = store
            .put(txn, "friends", None, record! { "name" => "b" }, WriteMode::Insert)
            .unwrap();
        assert_eq!(next, Key::Integer(11));
    }

    #[test]
    fn falsy_keys_are_ordinary_keys() {
        let store = store();
        let txn = rw(&store, "blobs");
        for key in [Key::Integer(0), Key::from(""), Key::Bool(false)] {
            store
                .put(txn, "blobs", Some(key.clone()), record! { "v" => 1 }, WriteMode::Insert)
                .unwrap();
        }
        store.commit(txn).unwrap();
        assert_eq!(store.len("blobs").unwrap(), 3);

        let txn = rw(&store, "blobs");
        let err = store
            .put(txn, "blobs", Some(Key::Integer(0)), record! { "v" => 2 }, WriteMode::Insert)
            .unwrap_err();
        assert!(matches!(err, StorageError::Constraint { .. }));
        store
            .put(txn, "blobs", Some(Key::from("")), record! { "v" => 2 }, WriteMode::Upsert)
            .unwrap();
        let rec = store.get(txn, "blobs", &Key::from("")).unwrap().unwrap();
        assert_eq!(rec.get("v"), Some(&Value::Integer(2)));
    }

    #[test]
    fn outbound_table_requires_key() {
        let store = store();
        let txn = rw(&store, "blobs");
        let err = store
            .put(txn, "blobs", None, record! { "v" => 1 }, WriteMode::Insert)
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingKey { .. }));
    }

    #[test]
    fn staged_writes_are_private_until_commit() {
        let store = store();
        let writer = rw(&store, "friends");
        store
            .put(writer, "friends", None, record! { "name" => "a" }, WriteMode::Insert)
            .unwrap();

        let reader = store
            .begin(AccessMode::ReadOnly, &["friends".to_string()])
            .unwrap();
        assert_eq!(store.count(reader, "friends", &IndexQuery::all()).unwrap(), 0);
        assert_eq!(store.count(writer, "friends", &IndexQuery::all()).unwrap(), 1);

        store.commit(writer).unwrap();
        assert_eq!(store.count(reader, "friends", &IndexQuery::all()).unwrap(), 1);
        assert_eq!(store.committed_sequence(), 1);
    }

    #[test]
    fn abort_discards_writes() {
        let store = store();
        let txn = rw(&store, "friends");
        store
            .put(txn, "friends", None, record! { "name" => "a" }, WriteMode::Insert)
            .unwrap();
        store.abort(txn).unwrap();
        assert_eq!(store.len("friends").unwrap(), 0);
        assert_eq!(store.open_transactions(), 0);
        assert!(matches!(
            store.commit(txn),
            Err(StorageError::TransactionNotFound { .. })
        ));
    }

    #[test]
    fn unique_index_is_enforced() {
        let store = store();
        let txn = rw(&store, "friends");
        store
            .put(txn, "friends", None, record! { "name" => "a", "email" => "x@y" }, WriteMode::Insert)
            .unwrap();
        let err = store
            .put(txn, "friends", None, record! { "name" => "b", "email" => "x@y" }, WriteMode::Insert)
            .unwrap_err();
        assert!(matches!(err, StorageError::Constraint { .. }));

        // Rewriting the owner itself is fine.
        store
            .put(
                txn,
                "friends",
                Some(Key::Integer(1)),
                record! { "name" => "a2", "email" => "x@y" },
                WriteMode::Upsert,
            )
            .unwrap();
        store.commit(txn).unwrap();
    }

    #[test]
    fn unique_swap_within_transaction() {
        let store = store();
        let txn = rw(&store, "friends");
        for (name, email) in [("a", "1"), ("b", "2")] {
            store
                .put(txn, "friends", None, record! { "name" => name, "email" => email }, WriteMode::Insert)
                .unwrap();
        }
        store.commit(txn).unwrap();

        let txn = rw(&store, "friends");
        store.delete(txn, "friends", &Key::Integer(1)).unwrap();
        store
            .put(
                txn,
                "friends",
                Some(Key::Integer(2)),
                record! { "name" => "b", "email" => "1" },
                WriteMode::Upsert,
            )
            .unwrap();
        store.commit(txn).unwrap();
        assert_eq!(store.len("friends").unwrap(), 1);
    }

    #[test]
    fn multi_entry_index_scan() {
        let store = store();
        let txn = rw(&store, "friends");
        store
            .put(txn, "friends", None, record! { "name" => "a", "tags" => vec!["x", "y"] }, WriteMode::Insert)
            .unwrap();
        store
            .put(txn, "friends", None, record! { "name" => "b", "tags" => vec!["y"] }, WriteMode::Insert)
            .unwrap();
        store.commit(txn).unwrap();

        let txn = rw(&store, "friends");
        let y = store
            .scan(txn, "friends", &IndexQuery::index("tags", Predicate::Equals(Key::from("y"))))
            .unwrap();
        assert_eq!(names(&store, txn, &y), vec!["a", "b"]);

        let any = store
            .scan(
                txn,
                "friends",
                &IndexQuery::index("tags", Predicate::AnyOf(vec![Key::from("x"), Key::from("y")])),
            )
            .unwrap();
        assert_eq!(any.len(), 2);

        let none = store
            .count(txn, "friends", &IndexQuery::index("tags", Predicate::AnyOf(vec![])))
            .unwrap();
        assert_eq!(none, 0);
    }

    #[test]
    fn scan_merges_staged_writes() {
        let store = store();
        let txn = rw(&store, "friends");
        for name in ["carl", "anna"] {
            store
                .put(txn, "friends", None, record! { "name" => name }, WriteMode::Insert)
                .unwrap();
        }
        store.commit(txn).unwrap();

        let txn = rw(&store, "friends");
        store
            .put(txn, "friends", None, record! { "name" => "bert" }, WriteMode::Insert)
            .unwrap();
        store.delete(txn, "friends", &Key::Integer(1)).unwrap();
        let keys = store
            .scan(txn, "friends", &IndexQuery::index("name", Predicate::All))
            .unwrap();
        assert_eq!(names(&store, txn, &keys), vec!["anna", "bert"]);
    }

    #[test]
    fn unknown_index_is_an_error() {
        let store = store();
        let txn = rw(&store, "friends");
        let err = store
            .scan(txn, "friends", &IndexQuery::index("age", Predicate::All))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownIndex { .. }));
    }

    #[test]
    fn stale_read_conflicts_at_commit() {
        let store = store();
        let setup = rw(&store, "friends");
        store
            .put(setup, "friends", None, record! { "name" => "a" }, WriteMode::Insert)
            .unwrap();
        store.commit(setup).unwrap();

        let first = rw(&store, "friends");
        let second = rw(&store, "friends");
        let key = Key::Integer(1);
        store.get(first, "friends", &key).unwrap();
        store.get(second, "friends", &key).unwrap();
        store
            .put(first, "friends", Some(key.clone()), record! { "name" => "b" }, WriteMode::Upsert)
            .unwrap();
        store
            .put(second, "friends", Some(key.clone()), record! { "name" => "c" }, WriteMode::Upsert)
            .unwrap();
        store.commit(first).unwrap();
        assert!(matches!(
            store.commit(second),
            Err(StorageError::Conflict { .. })
        ));
    }

    #[test]
    fn concurrent_inserts_of_same_key() {
        let store = store();
        let first = rw(&store, "blobs");
        let second = rw(&store, "blobs");
        for txn in [first, second] {
            store
                .put(txn, "blobs", Some(Key::from("k")), record! {}, WriteMode::Insert)
                .unwrap();
        }
        store.commit(first).unwrap();
        assert!(matches!(
            store.commit(second),
            Err(StorageError::Constraint { .. })
        ));
        assert_eq!(store.len("blobs").unwrap(), 1);
    }

    #[test]
    fn read_only_rejects_writes_and_scope_is_checked() {
        let store = store();
        let txn = store
            .begin(AccessMode::ReadOnly, &["friends".to_string()])
            .unwrap();
        assert!(matches!(
            store.put(txn, "friends", None, record! {}, WriteMode::Upsert),
            Err(StorageError::ReadOnly { .. })
        ));
        assert!(matches!(
            store.get(txn, "blobs", &Key::Integer(1)),
            Err(StorageError::TableOutOfScope { .. })
        ));
        assert!(store
            .begin(AccessMode::ReadOnly, &["missing".to_string()])
            .is_err());
    }

    #[test]
    fn wrapped_values_are_rejected_by_put() {
        let store = store();
        let txn = rw(&store, "friends");
        let err = store
            .put(
                txn,
                "friends",
                None,
                record! { "name" => "a", "born" => Value::wrapped("date", 0i64) },
                WriteMode::Insert,
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::Codec(_)));
    }

    #[test]
    fn delete_of_fresh_insert_leaves_nothing() {
        let store = store();
        let txn = rw(&store, "blobs");
        let key = Key::Integer(0);
        store
            .put(txn, "blobs", Some(key.clone()), record! {}, WriteMode::Insert)
            .unwrap();
        assert!(store.delete(txn, "blobs", &key).unwrap());
        assert!(!store.delete(txn, "blobs", &key).unwrap());
        store.commit(txn).unwrap();
        assert_eq!(store.len("blobs").unwrap(), 0);
    }
}
