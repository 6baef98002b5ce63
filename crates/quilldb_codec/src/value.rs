//! Dynamic document value type.

use std::collections::BTreeMap;

/// A dynamic document value.
///
/// Every variant except [`Value::Wrapped`] has a canonical CBOR form.
/// `Wrapped` carries a tagged in-memory representation (for example a
/// timestamp lifted into a domain object by a `reading` hook) and is
/// rejected by the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Nested document, keyed by field name.
    Map(BTreeMap<String, Value>),
    /// In-memory domain value. Never persisted.
    Wrapped {
        /// Domain tag, e.g. `"date"`.
        tag: String,
        /// The storable payload the domain value was built from.
        payload: Box<Value>,
    },
}

impl Value {
    /// Creates a wrapped domain value.
    pub fn wrapped(tag: impl Into<String>, payload: impl Into<Value>) -> Self {
        Value::Wrapped {
            tag: tag.into(),
            payload: Box::new(payload.into()),
        }
    }

    /// Returns true if this value (recursively) has a canonical CBOR form.
    pub fn is_storable(&self) -> bool {
        match self {
            Value::Wrapped { .. } => false,
            Value::Array(items) => items.iter().all(Value::is_storable),
            Value::Map(fields) => fields.values().all(Value::is_storable),
            _ => true,
        }
    }

    /// Returns the tag of the first wrapped value found, depth first.
    pub fn first_wrapped_tag(&self) -> Option<&str> {
        match self {
            Value::Wrapped { tag, .. } => Some(tag),
            Value::Array(items) => items.iter().find_map(Value::first_wrapped_tag),
            Value::Map(fields) => fields.values().find_map(Value::first_wrapped_tag),
            _ => None,
        }
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the bytes of a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the text of a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a nested document, if it is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `(tag, payload)` if this is a wrapped domain value.
    pub fn as_wrapped(&self) -> Option<(&str, &Value)> {
        match self {
            Value::Wrapped { tag, payload } => Some((tag, payload)),
            _ => None,
        }
    }

    /// Unwraps a domain value with the given tag back to its payload.
    ///
    /// Values with a different tag, and plain values, are returned as-is.
    pub fn unwrap_tagged(self, expected: &str) -> Value {
        match self {
            Value::Wrapped { tag, payload } if tag == expected => *payload,
            other => other,
        }
    }

    /// Look up a field in a nested document.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(field))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

macro_rules! array_from_vec {
    ($($t:ty),+) => {
        $(
            impl From<Vec<$t>> for Value {
                fn from(v: Vec<$t>) -> Self {
                    Value::Array(v.into_iter().map(Into::into).collect())
                }
            }
        )+
    };
}

array_from_vec!(Value, bool, i64, i32, String, &str);

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
