//! Transaction lifecycle: begin, drain, commit or roll back.

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::transaction::handle::{Transaction, TxnInner};
use crate::transaction::queue::OpQueue;
use crate::transaction::state::TransactionState;
use crate::types::{SequenceNumber, TransactionId};
use parking_lot::Mutex;
use quilldb_storage::AccessMode;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens a transaction over `tables`.
///
/// The store transaction is opened right away, so the transaction exists
/// before any of its operations is issued.
pub(crate) fn begin(db: &Database, mode: AccessMode, tables: Vec<String>) -> CoreResult<Transaction> {
    for table in &tables {
        db.table(table)?;
    }
    let store_txn = db.store().begin(mode, &tables)?;
    let id = TransactionId::new(db.next_transaction_id());
    debug!(txn = %id, %mode, ?tables, "transaction started");

    Ok(Transaction {
        inner: Arc::new(TxnInner {
            id,
            mode,
            tables,
            store_txn,
            db: db.clone(),
            state: Mutex::new(TransactionState::Active),
            failure: Mutex::new(None),
            queue: OpQueue::new(),
        }),
    })
}

impl Transaction {
    /// Runs a transaction body to completion.
    pub(crate) async fn run<T, F, Fut>(self, body: F) -> CoreResult<T>
    where
        F: FnOnce(Transaction) -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let outcome = body(self.clone()).await;
        self.complete(outcome).await
    }

    /// Settles the transaction once the body produced `outcome`.
    ///
    /// Waits for every issued operation, then commits if nothing failed.
    /// Otherwise rolls back and reports the first failure wrapped in
    /// [`CoreError::TransactionAborted`].
    pub(crate) async fn complete<T>(&self, outcome: CoreResult<T>) -> CoreResult<T> {
        if let Err(err) = &outcome {
            self.fail(err.clone());
        }
        self.inner.queue.drained().await;

        if let Some(cause) = self.failure() {
            self.rollback();
            return Err(self.aborted(cause));
        }

        self.set_state(TransactionState::Committing);
        match self.inner.db.store().commit(self.inner.store_txn) {
            Ok(seq) => {
                self.set_state(TransactionState::Committed);
                debug!(txn = %self.id(), seq = %SequenceNumber::new(seq), "transaction committed");
                outcome
            }
            Err(err) => {
                let cause = CoreError::from(err);
                self.set_state(TransactionState::Aborted);
                warn!(txn = %self.id(), error = %cause, "commit failed, transaction rolled back");
                *self.inner.failure.lock() = Some(cause.clone());
                Err(self.aborted(cause))
            }
        }
    }

    fn rollback(&self) {
        if let Err(err) = self.inner.db.store().abort(self.inner.store_txn) {
            warn!(txn = %self.id(), error = %err, "store rollback failed");
        }
        self.set_state(TransactionState::Aborted);
        debug!(txn = %self.id(), "transaction rolled back");
    }
}
