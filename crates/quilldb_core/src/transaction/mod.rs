//! Transaction management.
//!
//! A transaction groups operations on one or more tables into a unit that
//! commits or rolls back as a whole:
//! - **Ordering**: operations run one at a time, in the order they were
//!   issued, whether or not the caller awaits them
//! - **Commit**: attempted only after the body returned and every issued
//!   operation finished
//! - **Rollback**: the first failure dooms the transaction and becomes the
//!   cause of the single [`CoreError::TransactionAborted`](crate::CoreError)
//!   the caller receives
//! - **Isolation**: writes become visible to other transactions at commit

mod handle;
pub(crate) mod manager;
mod queue;
mod state;

pub use handle::Transaction;
pub use state::TransactionState;
