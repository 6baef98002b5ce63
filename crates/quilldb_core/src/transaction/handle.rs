//! The transaction handle.

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::request::Request;
use crate::table::Table;
use crate::transaction::queue::{Hold, OpQueue, Ticket};
use crate::transaction::state::TransactionState;
use crate::types::TransactionId;
use parking_lot::Mutex;
use quilldb_storage::{AccessMode, StoreTxn};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub(crate) struct TxnInner {
    /// Transaction ID.
    pub(crate) id: TransactionId,
    /// Access mode.
    pub(crate) mode: AccessMode,
    /// Tables in scope.
    pub(crate) tables: Vec<String>,
    /// Record store transaction backing this one.
    pub(crate) store_txn: StoreTxn,
    /// Owning database.
    pub(crate) db: Database,
    /// Current state.
    pub(crate) state: Mutex<TransactionState>,
    /// First failure; the abort reason.
    pub(crate) failure: Mutex<Option<CoreError>>,
    /// Issue-ordered operations.
    pub(crate) queue: Arc<OpQueue>,
}

impl Drop for TxnInner {
    fn drop(&mut self) {
        if self.state.get_mut().is_finished() {
            return;
        }
        debug!(txn = %self.id, "transaction dropped while open, rolling back");
        if let Err(err) = self.db.store().abort(self.store_txn) {
            trace!(txn = %self.id, error = %err, "store rollback after drop failed");
        }
    }
}

/// A transaction.
///
/// Handles are cheap to clone; every clone refers to the same transaction.
/// Tables obtained through [`Transaction::table`] issue their operations
/// into this transaction, where they run one at a time in issue order.
///
/// The first failing operation dooms the transaction: operations still
/// queued behind it resolve with [`CoreError::TransactionAborted`], and the
/// transaction rolls back once the body returns.
#[derive(Clone)]
pub struct Transaction {
    pub(crate) inner: Arc<TxnInner>,
}

impl Transaction {
    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    /// Returns the access mode.
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.inner.mode
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        *self.inner.state.lock()
    }

    /// Returns the tables in scope.
    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.inner.tables
    }

    /// Returns true if the table is in scope.
    #[must_use]
    pub fn includes(&self, table: &str) -> bool {
        self.inner.tables.iter().any(|t| t == table)
    }

    /// Returns the first failure recorded so far.
    #[must_use]
    pub fn failure(&self) -> Option<CoreError> {
        self.inner.failure.lock().clone()
    }

    /// Returns a table bound to this transaction.
    ///
    /// # Errors
    ///
    /// Fails if the table does not exist or is not in scope.
    pub fn table(&self, name: &str) -> CoreResult<Table> {
        let table = self.inner.db.table(name)?;
        if !self.includes(name) {
            return Err(CoreError::TableNotInScope {
                table: name.to_string(),
            });
        }
        Ok(table.bind(self.clone()))
    }

    /// Requests a rollback.
    ///
    /// Operations issued afterwards fail, and the transaction resolves with
    /// [`CoreError::TransactionAborted`] caused by
    /// [`CoreError::AbortRequested`].
    pub fn abort(&self) {
        self.fail(CoreError::AbortRequested);
    }

    /// Runs a nested transaction body.
    ///
    /// If this transaction is active, its mode covers `mode` and every table
    /// is in scope, the body joins it: its operations queue here and commit
    /// with the rest, and a body error fails this transaction too.
    /// Otherwise the body runs in an independent transaction.
    pub fn transaction<T, F, Fut>(&self, mode: AccessMode, tables: &[&str], body: F) -> Request<T>
    where
        T: Send + 'static,
        F: FnOnce(Transaction) -> Fut + Send + 'static,
        Fut: Future<Output = CoreResult<T>> + Send + 'static,
    {
        let joinable = self.state() == TransactionState::Active
            && self.mode().covers(mode)
            && tables.iter().all(|t| self.includes(t));
        if !joinable {
            return self.inner.db.transaction(mode, tables, body);
        }

        trace!(txn = %self.id(), %mode, "nested transaction joins parent");
        let parent = self.clone();
        let hold = self.hold();
        Request::spawn(async move {
            let guard = UnwindGuard::new(&parent, "nested transaction body");
            let result = body(parent.clone()).await;
            guard.disarm();
            if let Err(err) = &result {
                parent.fail(err.clone());
            }
            drop(hold);
            result
        })
    }

    pub(crate) fn issue(&self) -> Ticket {
        self.inner.queue.issue()
    }

    pub(crate) fn hold(&self) -> Hold {
        self.inner.queue.hold()
    }

    /// Runs one operation once every earlier operation has finished.
    ///
    /// A failure of the operation is recorded as the transaction's abort
    /// reason unless an earlier failure exists.
    pub(crate) async fn run_op<T, F, Fut>(
        &self,
        ticket: Ticket,
        table: &str,
        mode: AccessMode,
        op: F,
    ) -> CoreResult<T>
    where
        F: FnOnce(StoreTxn) -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        ticket.turn().await;
        self.check_active()?;
        trace!(txn = %self.id(), op = ticket.seq(), table, "running operation");

        let guard = UnwindGuard::new(self, "operation");
        let result = match self.check_access(table, mode) {
            Ok(()) => op(self.inner.store_txn).await,
            Err(err) => Err(err),
        };
        guard.disarm();
        if let Err(err) = &result {
            self.fail(err.clone());
        }
        drop(ticket);
        result
    }

    /// Records a failure. Only the first one is kept.
    pub(crate) fn fail(&self, err: CoreError) {
        {
            let mut failure = self.inner.failure.lock();
            if failure.is_some() {
                return;
            }
            warn!(txn = %self.id(), error = %err, "operation failed, transaction will roll back");
            *failure = Some(err);
        }
        let mut state = self.inner.state.lock();
        if *state == TransactionState::Active {
            *state = TransactionState::Aborting;
        }
    }

    pub(crate) fn set_state(&self, state: TransactionState) {
        *self.inner.state.lock() = state;
    }

    pub(crate) fn aborted(&self, cause: CoreError) -> CoreError {
        CoreError::TransactionAborted {
            txn: self.id(),
            cause: Box::new(cause),
        }
    }

    fn check_active(&self) -> CoreResult<()> {
        match self.state() {
            TransactionState::Active => Ok(()),
            TransactionState::Aborting | TransactionState::Aborted => Err(self.aborted(
                self.failure().unwrap_or(CoreError::AbortRequested),
            )),
            TransactionState::Committing | TransactionState::Committed => {
                Err(CoreError::TransactionInactive { txn: self.id() })
            }
        }
    }

    fn check_access(&self, table: &str, mode: AccessMode) -> CoreResult<()> {
        if !self.includes(table) {
            return Err(CoreError::TableNotInScope {
                table: table.to_string(),
            });
        }
        if !self.mode().covers(mode) {
            return Err(CoreError::ReadOnlyTransaction {
                table: table.to_string(),
            });
        }
        Ok(())
    }
}

/// Fails the transaction if dropped before [`UnwindGuard::disarm`].
///
/// Work that panics or is torn down mid-flight never reaches its own error
/// handling. Declared after the ticket or hold it covers, so the failure is
/// recorded before the queue moves on.
struct UnwindGuard<'a> {
    txn: &'a Transaction,
    what: &'static str,
    armed: bool,
}

impl<'a> UnwindGuard<'a> {
    fn new(txn: &'a Transaction, what: &'static str) -> Self {
        Self {
            txn,
            what,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let message = if std::thread::panicking() {
            format!("{} panicked", self.what)
        } else {
            format!("{} was cancelled", self.what)
        };
        self.txn.fail(CoreError::task_failed(message));
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("mode", &self.inner.mode)
            .field("tables", &self.inner.tables)
            .field("state", &self.state())
            .finish()
    }
}
