//! # QuillDB Core
//!
//! Hook-driven transactional document engine for QuillDB.
//!
//! This crate provides:
//! - Lifecycle hooks per table (`creating`, `reading`, `updating`,
//!   `writing`, `deleting`) with ordered, snapshot-dispatched subscribers
//! - Primary key resolution that keeps explicit falsy keys (`0`, `""`,
//!   `false`) apart from absent ones
//! - Transactions whose operations run in issue order and that commit or
//!   roll back as a unit, reporting the first failure exactly once
//! - Batched `modify` over query matches that yields to the scheduler
//!   between chunks
//! - A read pipeline applying `reading` hooks to every record handed out
//!
//! Records live in a [`RecordStore`]; [`MemoryStore`] is the default.
//! Operations return [`Request`] futures and need a Tokio runtime.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod database;
mod error;
mod hooks;
mod keys;
mod mutation;
mod query;
mod read;
mod request;
mod scope;
mod table;
mod transaction;
mod types;

pub use config::Config;
pub use database::{Database, DatabaseBuilder};
pub use error::{BoxError, CoreError, CoreResult, HookResult};
pub use hooks::{
    CreatingHook, DeletingHook, Hook, HookEvent, HookRegistry, ReadingHook, Subscription,
    TableHooks, UpdatingHook, WritingHook,
};
pub use keys::{resolve_key, KeySource, ResolvedKey};
pub use mutation::{Change, Modifications};
pub use query::{Collection, WhereClause};
pub use request::Request;
pub use table::Table;
pub use transaction::{Transaction, TransactionState};
pub use types::{SequenceNumber, TransactionId};

// Re-export the data model and store types callers need
pub use quilldb_codec::{record, Key, Record, Value};
pub use quilldb_storage::{AccessMode, MemoryStore, RecordStore, TableSchema};
