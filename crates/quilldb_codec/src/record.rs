//! Schemaless records.

use crate::decoder::from_cbor_value;
use crate::encoder::to_cbor_value;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// A record: an ordered mapping from field name to value.
///
/// Records have no fixed schema. Hooks may add, replace or remove fields
/// freely; only the fields named by a table's key path and indexes carry
/// meaning for the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from any serde-serializable struct or map.
    ///
    /// # Errors
    ///
    /// Fails if `value` does not serialize to a map with text keys, or
    /// contains floats.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> CodecResult<Self> {
        let raw = ciborium::value::Value::serialized(value)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        match from_cbor_value(raw)? {
            Value::Map(fields) => Ok(Self { fields }),
            other => Err(CodecError::invalid_structure(format!(
                "expected a map, found {other:?}"
            ))),
        }
    }

    /// Deserializes this record into a typed value.
    ///
    /// # Errors
    ///
    /// Fails if the record still holds wrapped domain values or does not
    /// match the shape of `T`.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> CodecResult<T> {
        let raw = to_cbor_value(&Value::Map(self.fields.clone()))?;
        raw.deserialized()
            .map_err(|e| CodecError::decoding_failed(e.to_string()))
    }

    /// Returns the value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a mutable reference to a field.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Builder-style [`Record::set`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the field is present (even if `Null`).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if every field has a canonical CBOR form.
    pub fn is_storable(&self) -> bool {
        self.fields.values().all(Value::is_storable)
    }

    /// Returns the underlying field map.
    pub fn into_fields(self) -> BTreeMap<String, Value> {
        self.fields
    }

    /// Returns this record as a `Value::Map`.
    pub fn into_value(self) -> Value {
        Value::Map(self.fields)
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for Record {
    type Error = CodecError;

    fn try_from(value: Value) -> CodecResult<Self> {
        match value {
            Value::Map(fields) => Ok(Self { fields }),
            other => Err(CodecError::invalid_structure(format!(
                "expected a map, found {other:?}"
            ))),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Builds a [`Record`] from `field => value` pairs.
///
/// ```
/// use quilldb_codec::{record, Value};
///
/// let friend = record! { "name" => "Arnold", "age" => 42 };
/// assert_eq!(friend.get("age"), Some(&Value::Integer(42)));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($field:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $( record.set($field, $value); )+
        record
    }};
}
