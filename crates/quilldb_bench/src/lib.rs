//! Benchmarks for QuillDB.
//!
//! The benchmarks live under `benches/`; this library holds the data
//! generators they share.

pub mod utils;
