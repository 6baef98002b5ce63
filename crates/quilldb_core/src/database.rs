//! Database facade.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::hooks::HookRegistry;
use crate::request::Request;
use crate::table::Table;
use crate::transaction::{manager, Transaction};
use crate::types::SequenceNumber;
use quilldb_storage::{AccessMode, MemoryStore, RecordStore, TableSchema};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct DbInner {
    /// Configuration.
    config: Config,
    /// Record store holding the data.
    store: Arc<dyn RecordStore>,
    /// Table schemas, as created in the store.
    schemas: HashMap<String, Arc<TableSchema>>,
    /// Hooks of every table.
    hooks: HookRegistry,
    /// Next transaction ID.
    next_txid: AtomicU64,
}

/// The main database handle.
///
/// `Database` is cheap to clone; clones share the store, the tables and
/// their hooks. It provides:
/// - Table handles with hooks ([`Database::table`])
/// - Explicit transactions ([`Database::transaction`])
///
/// Every operation is spawned on the current Tokio runtime.
///
/// # Example
///
/// ```rust
/// use quilldb_core::{record, AccessMode, Database};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> quilldb_core::CoreResult<()> {
/// let db = Database::open_in_memory(&[("friends", "++id, name, *tags")])?;
///
/// db.table("friends")?.hook().writing(|mut friend| {
///     let name = friend.get("name").and_then(|v| v.as_text()).unwrap_or("").to_string();
///     friend.set("tags", name.split(' ').map(str::to_lowercase).collect::<Vec<_>>());
///     Ok(friend)
/// });
///
/// let id = db
///     .transaction(AccessMode::ReadWrite, &["friends"], |tx| async move {
///         tx.table("friends")?.add(record! { "name" => "Ada Lovelace" }).await
///     })
///     .await?;
///
/// let ada = db.table("friends")?.get(id).await?.expect("committed");
/// assert_eq!(ada.get("tags").and_then(|v| v.as_array()).map(|t| t.len()), Some(2));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DbInner>,
}

impl Database {
    /// Starts building a database.
    #[must_use]
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Opens an in-memory database with `(name, schema)` tables.
    ///
    /// # Errors
    ///
    /// Fails if a schema string is invalid or a name repeats.
    pub fn open_in_memory(tables: &[(&str, &str)]) -> CoreResult<Self> {
        tables
            .iter()
            .fold(Self::builder(), |builder, (name, schema)| {
                builder.table(*name, *schema)
            })
            .build()
    }

    /// Opens a database over an existing store, using the tables it holds.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot report a table's schema.
    pub fn with_store(config: Config, store: Arc<dyn RecordStore>) -> CoreResult<Self> {
        let schemas = store
            .table_names()
            .into_iter()
            .map(|name| store.schema(&name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(config, store, schemas))
    }

    fn assemble(config: Config, store: Arc<dyn RecordStore>, schemas: Vec<TableSchema>) -> Self {
        let hooks = HookRegistry::new(schemas.iter().map(|s| s.name.clone()));
        let schemas: HashMap<_, _> = schemas
            .into_iter()
            .map(|s| (s.name.clone(), Arc::new(s)))
            .collect();
        debug!(tables = schemas.len(), "database opened");
        Self {
            inner: Arc::new(DbInner {
                config,
                store,
                schemas,
                hooks,
                next_txid: AtomicU64::new(1),
            }),
        }
    }

    /// Returns an unbound handle to a table.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownTable`] if the table does not exist.
    pub fn table(&self, name: &str) -> CoreResult<Table> {
        let unknown = || CoreError::UnknownTable {
            table: name.to_string(),
        };
        let schema = self.inner.schemas.get(name).ok_or_else(unknown)?;
        let hooks = self.inner.hooks.table(name).ok_or_else(unknown)?;
        Ok(Table::new(self.clone(), Arc::clone(schema), Arc::clone(hooks)))
    }

    /// Runs `body` in a new transaction over `tables`.
    ///
    /// The transaction commits once the body returned `Ok` and every
    /// operation it issued finished without error. Otherwise it rolls back
    /// and the request fails with [`CoreError::TransactionAborted`] carrying
    /// the first failure.
    pub fn transaction<T, F, Fut>(&self, mode: AccessMode, tables: &[&str], body: F) -> Request<T>
    where
        T: Send + 'static,
        F: FnOnce(Transaction) -> Fut + Send + 'static,
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
    {
        let tables = tables.iter().map(|t| (*t).to_string()).collect();
        match manager::begin(self, mode, tables) {
            Ok(txn) => Request::spawn(txn.run(body)),
            Err(err) => Request::failed(err),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the record store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.store
    }

    /// Returns the hooks of every table.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }

    /// Returns the table names, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.schemas.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the sequence number of the latest commit.
    #[must_use]
    pub fn committed_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.inner.store.committed_sequence())
    }

    pub(crate) fn next_transaction_id(&self) -> u64 {
        self.inner.next_txid.fetch_add(1, Ordering::SeqCst)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.inner.config)
            .field("tables", &self.table_names())
            .finish()
    }
}

/// Builder for [`Database`].
#[derive(Default)]
pub struct DatabaseBuilder {
    config: Config,
    tables: Vec<(String, String)>,
    schemas: Vec<TableSchema>,
    store: Option<Arc<dyn RecordStore>>,
}

impl DatabaseBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Declares a table with a schema string such as `"++id, name, &email, *tags"`.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>, schema: impl Into<String>) -> Self {
        self.tables.push((name.into(), schema.into()));
        self
    }

    /// Declares a table with a prepared schema.
    #[must_use]
    pub fn table_schema(mut self, schema: TableSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Uses `store` instead of a fresh [`MemoryStore`]. Tables already in
    /// the store are kept; declared tables are created in it.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Creates the declared tables and opens the database.
    ///
    /// # Errors
    ///
    /// Fails if a schema is invalid or a table already exists.
    pub fn build(self) -> CoreResult<Database> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn RecordStore>);
        for (name, spec) in self.tables {
            store.create_table(TableSchema::parse(name, &spec)?)?;
        }
        for schema in self.schemas {
            store.create_table(schema)?;
        }
        Database::with_store(self.config, store)
    }
}
