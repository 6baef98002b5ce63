//! Error types for storage operations.

use quilldb_codec::CodecError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A write would violate a primary key or unique index constraint.
    #[error("constraint violation in table '{table}': {message}")]
    Constraint {
        /// Table the write targeted.
        table: String,
        /// Which constraint was violated.
        message: String,
    },

    /// A record read by the transaction changed before it committed.
    #[error("transaction conflict on key {key} in table '{table}'")]
    Conflict {
        /// Table of the conflicting record.
        table: String,
        /// Display form of the conflicting key.
        key: String,
    },

    /// The table does not exist.
    #[error("unknown table '{table}'")]
    UnknownTable {
        /// Requested table name.
        table: String,
    },

    /// A table with this name already exists.
    #[error("table '{table}' already exists")]
    TableExists {
        /// Requested table name.
        table: String,
    },

    /// The table has no index with this name.
    #[error("table '{table}' has no index '{index}'")]
    UnknownIndex {
        /// Table name.
        table: String,
        /// Requested index.
        index: String,
    },

    /// The table is not part of the transaction's scope.
    #[error("table '{table}' is not part of the transaction")]
    TableOutOfScope {
        /// Requested table.
        table: String,
    },

    /// A write was attempted in a read-only transaction.
    #[error("cannot write to '{table}' in a read-only transaction")]
    ReadOnly {
        /// Table the write targeted.
        table: String,
    },

    /// No key was supplied and the table cannot generate one.
    #[error("table '{table}' requires an explicit key")]
    MissingKey {
        /// Table name.
        table: String,
    },

    /// The transaction handle is unknown (already committed or aborted).
    #[error("store transaction {txn} not found")]
    TransactionNotFound {
        /// Raw handle value.
        txn: u64,
    },

    /// The schema definition is invalid.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// Encoding or decoding a record failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl StorageError {
    /// Creates a constraint error.
    pub fn constraint(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constraint {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }
}
