//! Error types for QuillDB core.

use crate::hooks::HookEvent;
use crate::types::TransactionId;
use quilldb_codec::CodecError;
use quilldb_storage::StorageError;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed error returned by hooks and mutators.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result type returned by hook callbacks.
pub type HookResult<T> = Result<T, BoxError>;

/// Errors that can occur in QuillDB core operations.
///
/// `CoreError` is `Clone`: the first failure inside a transaction is handed
/// to the operation that produced it and also kept as the transaction's
/// abort reason.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// No key was supplied and the table cannot derive one.
    #[error("table '{table}' requires a primary key")]
    MissingKey {
        /// Table name.
        table: String,
    },

    /// A write violated a primary key or unique index constraint.
    #[error("constraint violation in table '{table}': {message}")]
    Constraint {
        /// Table name.
        table: String,
        /// Description from the store.
        message: String,
    },

    /// A registered hook returned an error.
    #[error("{event} hook on table '{table}' failed: {source}")]
    HookExecution {
        /// Table the hook is registered on.
        table: String,
        /// Lifecycle event of the hook.
        event: HookEvent,
        /// Error returned by the hook.
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// A `modify` callback returned an error.
    #[error("modify callback on table '{table}' failed: {source}")]
    MutatorFailed {
        /// Table being modified.
        table: String,
        /// Error returned by the callback.
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// The transaction rolled back. `cause` is the first failure.
    #[error("{txn} aborted: {cause}")]
    TransactionAborted {
        /// The aborted transaction.
        txn: TransactionId,
        /// First failure encountered in the transaction.
        #[source]
        cause: Box<CoreError>,
    },

    /// The transaction body asked for a rollback.
    #[error("transaction aborted by its body")]
    AbortRequested,

    /// The query is malformed.
    #[error("invalid query: {message}")]
    Query {
        /// Description of the problem.
        message: String,
    },

    /// A record read by the transaction changed before it committed.
    #[error("transaction conflict on key {key} in table '{table}'")]
    Conflict {
        /// Table name.
        table: String,
        /// Display form of the key.
        key: String,
    },

    /// The transaction has already committed or is committing.
    #[error("{txn} is no longer active")]
    TransactionInactive {
        /// The finished transaction.
        txn: TransactionId,
    },

    /// Implicit transactions are disabled and no transaction was bound.
    #[error("no transaction bound for operation on table '{table}'")]
    NoTransaction {
        /// Table name.
        table: String,
    },

    /// A write was issued in a read-only transaction.
    #[error("cannot write to '{table}' in a read-only transaction")]
    ReadOnlyTransaction {
        /// Table name.
        table: String,
    },

    /// The table is not part of the transaction's scope.
    #[error("table '{table}' is not part of the transaction")]
    TableNotInScope {
        /// Table name.
        table: String,
    },

    /// The table does not exist.
    #[error("unknown table '{table}'")]
    UnknownTable {
        /// Table name.
        table: String,
    },

    /// Other record store error.
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The task running an operation panicked or was cancelled.
    #[error("operation task failed: {message}")]
    TaskFailed {
        /// Description from the runtime.
        message: String,
    },

    /// An operation was issued outside a Tokio runtime.
    #[error("operations must be issued from within a Tokio runtime")]
    NoRuntime,
}

impl CoreError {
    /// Wraps a hook error.
    pub fn hook(table: impl Into<String>, event: HookEvent, source: BoxError) -> Self {
        Self::HookExecution {
            table: table.into(),
            event,
            source: Arc::from(source),
        }
    }

    /// Wraps a `modify` callback error.
    pub fn mutator(table: impl Into<String>, source: BoxError) -> Self {
        Self::MutatorFailed {
            table: table.into(),
            source: Arc::from(source),
        }
    }

    /// Creates a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Creates a task failure error.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }

    /// Returns true if this is a transaction abort.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::TransactionAborted { .. })
    }

    /// Returns the innermost cause, looking through transaction aborts.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::TransactionAborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Unwraps transaction aborts down to the first failure.
    pub fn into_cause(self) -> CoreError {
        match self {
            Self::TransactionAborted { cause, .. } => cause.into_cause(),
            other => other,
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Constraint { table, message } => Self::Constraint { table, message },
            StorageError::Conflict { table, key } => Self::Conflict { table, key },
            StorageError::MissingKey { table } => Self::MissingKey { table },
            StorageError::UnknownTable { table } => Self::UnknownTable { table },
            StorageError::TableOutOfScope { table } => Self::TableNotInScope { table },
            StorageError::ReadOnly { table } => Self::ReadOnlyTransaction { table },
            StorageError::UnknownIndex { table, index } => Self::Query {
                message: format!("table '{table}' has no index '{index}'"),
            },
            StorageError::Codec(err) => Self::Codec(err),
            other => Self::Storage(other),
        }
    }
}
