//! Primary key resolution for `add`/`put`.
//!
//! An absent key is `None`. Every `Some` key is explicit, including the
//! falsy ones (`0`, `""`, `false`): they are used verbatim and never
//! replaced by a generated key.

use crate::error::{CoreError, CoreResult};
use quilldb_codec::{Key, Record};
use quilldb_storage::TableSchema;

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Passed by the caller.
    Supplied,
    /// Read from the record's inline key path.
    Inline,
    /// To be generated by the store.
    Generated,
}

/// Outcome of key resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// The key, or `None` when the store generates it.
    pub key: Option<Key>,
    /// Where the key came from.
    pub source: KeySource,
}

impl ResolvedKey {
    /// Returns true if the caller passed the key.
    pub fn is_explicit(&self) -> bool {
        self.source == KeySource::Supplied
    }

    /// Returns the key to hand to the store.
    ///
    /// Only supplied keys are passed on. Inline keys are re-read from the
    /// record after hooks ran, and generated keys are left to the store.
    pub fn store_key(&self) -> Option<Key> {
        match self.source {
            KeySource::Supplied => self.key.clone(),
            KeySource::Inline | KeySource::Generated => None,
        }
    }
}

/// Decides the primary key of a record being created.
///
/// A supplied key wins and is written to the inline key path, if any.
/// Otherwise the inline key path is consulted, then the key generator.
///
/// # Errors
///
/// Fails with [`CoreError::MissingKey`] when none of these apply.
pub fn resolve_key(
    schema: &TableSchema,
    supplied: Option<Key>,
    record: &mut Record,
) -> CoreResult<ResolvedKey> {
    let pk = &schema.primary_key;
    if let Some(key) = supplied {
        if let Some(path) = &pk.path {
            path.assign(record, &key)?;
        }
        return Ok(ResolvedKey {
            key: Some(key),
            source: KeySource::Supplied,
        });
    }
    if let Some(key) = pk.path.as_ref().and_then(|p| p.extract(record)) {
        return Ok(ResolvedKey {
            key: Some(key),
            source: KeySource::Inline,
        });
    }
    if pk.auto_increment {
        return Ok(ResolvedKey {
            key: None,
            source: KeySource::Generated,
        });
    }
    Err(CoreError::MissingKey {
        table: schema.name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quilldb_codec::{record, Value};

    fn schema(spec: &str) -> TableSchema {
        TableSchema::parse("t", spec).unwrap()
    }

    #[test]
    fn falsy_supplied_keys_are_explicit() {
        for key in [Key::Integer(0), Key::from(""), Key::Bool(false)] {
            let mut rec = record! {};
            let resolved = resolve_key(&schema(""), Some(key.clone()), &mut rec).unwrap();
            assert!(resolved.is_explicit());
            assert_eq!(resolved.store_key(), Some(key));
        }
    }

    #[test]
    fn supplied_key_is_written_inline() {
        let mut rec = record! { "id" => 5 };
        let resolved = resolve_key(&schema("++id"), Some(Key::Integer(0)), &mut rec).unwrap();
        assert_eq!(resolved.key, Some(Key::Integer(0)));
        assert_eq!(rec.get("id"), Some(&Value::Integer(0)));
    }

    #[test]
    fn inline_zero_is_a_key_not_a_gap() {
        let mut rec = record! { "id" => 0 };
        let resolved = resolve_key(&schema("++id"), None, &mut rec).unwrap();
        assert_eq!(resolved.source, KeySource::Inline);
        assert_eq!(resolved.key, Some(Key::Integer(0)));
        assert_eq!(resolved.store_key(), None);
    }

    #[test]
    fn null_inline_key_falls_back_to_generator() {
        let mut rec = record! { "id" => Value::Null };
        let resolved = resolve_key(&schema("++id"), None, &mut rec).unwrap();
        assert_eq!(resolved.source, KeySource::Generated);
    }

    #[test]
    fn missing_key_without_generator() {
        let mut rec = record! { "name" => "x" };
        assert!(matches!(
            resolve_key(&schema("id"), None, &mut rec),
            Err(CoreError::MissingKey { .. })
        ));
        assert!(matches!(
            resolve_key(&schema(""), None, &mut rec),
            Err(CoreError::MissingKey { .. })
        ));
    }
}
