//! CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::Value as CborValue;
use std::collections::BTreeMap;

/// Decode CBOR bytes into a value.
///
/// # Errors
///
/// Fails on malformed input, floats, tags, non-text map keys and integers
/// outside the `i64` range.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let raw: CborValue = ciborium::de::from_reader(bytes)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    from_cbor_value(raw)
}

/// Lifts a ciborium value tree into a [`Value`].
pub(crate) fn from_cbor_value(raw: CborValue) -> CodecResult<Value> {
    Ok(match raw {
        CborValue::Null => Value::Null,
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Integer(n) => {
            Value::Integer(i64::try_from(n).map_err(|_| CodecError::IntegerOverflow)?)
        }
        CborValue::Bytes(b) => Value::Bytes(b),
        CborValue::Text(s) => Value::Text(s),
        CborValue::Float(_) => return Err(CodecError::FloatForbidden),
        CborValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_cbor_value)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        CborValue::Map(pairs) => {
            let mut fields = BTreeMap::new();
            for (k, v) in pairs {
                let CborValue::Text(name) = k else {
                    return Err(CodecError::invalid_structure("map keys must be text"));
                };
                fields.insert(name, from_cbor_value(v)?);
            }
            Value::Map(fields)
        }
        CborValue::Tag(tag, _) => {
            return Err(CodecError::invalid_structure(format!(
                "unsupported CBOR tag {tag}"
            )))
        }
        other => {
            return Err(CodecError::invalid_structure(format!(
                "unsupported CBOR item {other:?}"
            )))
        }
    })
}
