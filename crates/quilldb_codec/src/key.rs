//! Primary and index keys.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::fmt;

/// A key addressing a record or an index entry.
///
/// Keys are totally ordered: `Bool < Integer < Text < Bytes < Array`, and
/// arrays compare element by element. Falsy values (`0`, `""`, `false`) are
/// ordinary keys; the absence of a key is expressed as `Option::<Key>::None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Boolean key.
    Bool(bool),
    /// Integer key.
    Integer(i64),
    /// Text key.
    Text(String),
    /// Binary key.
    Bytes(Vec<u8>),
    /// Compound key.
    Array(Vec<Key>),
}

impl Key {
    /// Converts a value into a key, if it has a key form.
    ///
    /// `Null`, nested documents and wrapped values are not keys.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Integer(n) => Some(Key::Integer(*n)),
            Value::Text(s) => Some(Key::Text(s.clone())),
            Value::Bytes(b) => Some(Key::Bytes(b.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
            Value::Null | Value::Map(_) | Value::Wrapped { .. } => None,
        }
    }

    /// Converts a value into a key, failing with [`CodecError::InvalidKey`].
    pub fn try_from_value(value: &Value) -> CodecResult<Key> {
        Key::from_value(value)
            .ok_or_else(|| CodecError::invalid_key(format!("{value:?} has no key form")))
    }

    /// Returns the value form of this key.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Bool(b) => Value::Bool(*b),
            Key::Integer(n) => Value::Integer(*n),
            Key::Text(s) => Value::Text(s.clone()),
            Key::Bytes(b) => Value::Bytes(b.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_value).collect()),
        }
    }

    /// Returns the integer, if this is an integer key.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Key::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is a text key.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Key::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{b}"),
            Key::Integer(n) => write!(f, "{n}"),
            Key::Text(s) => write!(f, "{s:?}"),
            Key::Bytes(b) => write!(f, "0x{}", b.iter().map(|x| format!("{x:02x}")).collect::<String>()),
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Integer(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Integer(i64::from(n))
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Integer(i64::from(n))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Key::Bytes(b)
    }
}

impl From<Vec<Key>> for Key {
    fn from(items: Vec<Key>) -> Self {
        Key::Array(items)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

impl TryFrom<&Value> for Key {
    type Error = CodecError;

    fn try_from(value: &Value) -> CodecResult<Self> {
        Key::try_from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_values_are_keys() {
        assert_eq!(Key::from_value(&Value::Integer(0)), Some(Key::Integer(0)));
        assert_eq!(Key::from_value(&Value::from("")), Some(Key::Text(String::new())));
        assert_eq!(Key::from_value(&Value::Bool(false)), Some(Key::Bool(false)));
    }

    #[test]
    fn non_key_values() {
        assert_eq!(Key::from_value(&Value::Null), None);
        assert_eq!(Key::from_value(&Value::wrapped("date", 1i64)), None);
        assert_eq!(
            Key::from_value(&Value::Array(vec![Value::Integer(1), Value::Null])),
            None
        );
        assert!(Key::try_from_value(&Value::Null).is_err());
    }

    #[test]
    fn key_type_ordering() {
        let mut keys = vec![
            Key::Array(vec![Key::Integer(1)]),
            Key::from("a"),
            Key::Integer(10),
            Key::Bytes(vec![0]),
            Key::Bool(true),
            Key::Integer(-5),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::Bool(true),
                Key::Integer(-5),
                Key::Integer(10),
                Key::from("a"),
                Key::Bytes(vec![0]),
                Key::Array(vec![Key::Integer(1)]),
            ]
        );
    }

    #[test]
    fn compound_key_value_form() {
        let key = Key::Array(vec![Key::from("Doe"), Key::Integer(3)]);
        let value = key.to_value();
        assert_eq!(Key::from_value(&value), Some(key.clone()));
        assert_eq!(key.to_string(), "[\"Doe\",3]");
    }
}
