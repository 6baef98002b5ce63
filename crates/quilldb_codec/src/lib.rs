//! # QuillDB Codec
//!
//! Document value model and canonical CBOR encoding for QuillDB.
//!
//! This crate provides:
//! - [`Value`], the dynamic field value, including the in-memory only
//!   [`Value::Wrapped`] variant used for domain objects
//! - [`Key`], the ordered primary/index key type
//! - [`Record`], a schemaless field map
//! - deterministic CBOR encoding of storable values
//!
//! ## Canonical CBOR Rules
//!
//! - Maps are sorted by key (length-first, then bytewise)
//! - Integers use shortest encoding
//! - No floats
//! - No indefinite-length items
//! - Wrapped domain values are rejected
//!
//! ## Usage
//!
//! ```
//! use quilldb_codec::{from_cbor, record, to_canonical_cbor};
//!
//! let friend = record! { "name" => "Arnold", "age" => 42 };
//! let bytes = to_canonical_cbor(&friend.clone().into_value()).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), friend.into_value());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod key;
mod record;
mod value;

pub use decoder::from_cbor;
pub use encoder::to_canonical_cbor;
pub use error::{CodecError, CodecResult};
pub use key::Key;
pub use record::Record;
pub use value::Value;

/// Encodes a record to canonical CBOR.
///
/// # Errors
///
/// Fails if the record holds wrapped domain values.
pub fn encode_record(record: &Record) -> CodecResult<Vec<u8>> {
    if let Some(tag) = record.fields().find_map(|(_, v)| v.first_wrapped_tag()) {
        return Err(CodecError::NotStorable {
            tag: tag.to_string(),
        });
    }
    to_canonical_cbor(&record.clone().into_value())
}

/// Decodes a record previously written by [`encode_record`].
///
/// # Errors
///
/// Fails if the bytes are not a CBOR map with text keys.
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    Record::try_from(from_cbor(bytes)?)
}
