//! Transaction state.

use std::fmt;

/// State of a transaction.
///
/// ```text
/// Active -> Committing -> Committed
///    |          |
///    v          v
/// Aborting -> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Operations may be issued.
    Active,
    /// The body settled and the store commit is in progress.
    Committing,
    /// The transaction has been committed.
    Committed,
    /// An operation failed; queued operations drain before the rollback.
    Aborting,
    /// The transaction has been rolled back.
    Aborted,
}

impl TransactionState {
    /// Returns true if no further state change is possible.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Aborted)
    }

    /// Returns true if the transaction is on its way to a rollback.
    #[must_use]
    pub const fn is_aborting(self) -> bool {
        matches!(self, TransactionState::Aborting | TransactionState::Aborted)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Active => "active",
            TransactionState::Committing => "committing",
            TransactionState::Committed => "committed",
            TransactionState::Aborting => "aborting",
            TransactionState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}
