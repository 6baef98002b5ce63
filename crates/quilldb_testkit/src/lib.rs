//! # QuillDB Testkit
//!
//! Test utilities for QuillDB.
//!
//! This crate provides:
//! - Fixture schemas, records and pre-populated databases
//! - Hook sets used across tests, such as the `date` wrapping hooks
//! - Property-based test generators using proptest
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quilldb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_database() {
//!     init_logging();
//!     let db = friends_db();
//!     let friends = db.table(FRIENDS).unwrap();
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
