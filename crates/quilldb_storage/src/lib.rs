//! # QuillDB Storage
//!
//! The record store underneath the QuillDB engine.
//!
//! This crate defines the [`RecordStore`] contract the engine consumes and
//! ships [`MemoryStore`], an in-memory implementation of it. A record store
//! knows about tables, primary keys and secondary indexes; it knows nothing
//! about hooks, modification descriptors or operation ordering, which all
//! live in `quilldb_core`.
//!
//! ## Design Principles
//!
//! - Every operation runs against a transaction handle
//! - Reads through a handle see that handle's staged writes
//! - Commit is all-or-nothing and validated optimistically
//! - Records are held in canonical CBOR form
//! - Stores must be `Send + Sync` for concurrent access
//!
//! ## Schema Strings
//!
//! ```rust
//! use quilldb_storage::TableSchema;
//!
//! let schema = TableSchema::parse("friends", "++id, name, &email, *tags").unwrap();
//! assert!(schema.primary_key.auto_increment);
//! assert!(schema.index("email").unwrap().unique);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod index;
mod memory;
mod query;
mod schema;
mod staging;
mod store;

pub use error::{StorageError, StorageResult};
pub use index::SecondaryIndex;
pub use memory::MemoryStore;
pub use query::{IndexQuery, Predicate};
pub use schema::{IndexSpec, KeyPath, PrimaryKeySpec, TableSchema};
pub use store::{AccessMode, RecordStore, StoreTxn, WriteMode};
