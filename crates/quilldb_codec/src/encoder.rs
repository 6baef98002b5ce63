//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::Value as CborValue;
use std::cmp::Ordering;

/// Encode a value to canonical CBOR bytes.
///
/// Output is deterministic:
/// - map keys are sorted by their encoded form (length-first, then bytewise)
/// - integers use the shortest possible encoding
/// - no indefinite-length items
///
/// # Errors
///
/// Returns [`CodecError::NotStorable`] if the value contains a wrapped
/// domain value.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let raw = to_cbor_value(value)?;
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(&raw, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Lowers a value into ciborium's value tree with canonical map ordering.
pub(crate) fn to_cbor_value(value: &Value) -> CodecResult<CborValue> {
    Ok(match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(*b),
        Value::Integer(n) => CborValue::Integer((*n).into()),
        Value::Bytes(b) => CborValue::Bytes(b.clone()),
        Value::Text(s) => CborValue::Text(s.clone()),
        Value::Array(items) => CborValue::Array(
            items
                .iter()
                .map(to_cbor_value)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        Value::Map(fields) => {
            let mut pairs = fields
                .iter()
                .map(|(k, v)| Ok((k.as_str(), to_cbor_value(v)?)))
                .collect::<CodecResult<Vec<_>>>()?;
            pairs.sort_by(|a, b| cmp_canonical_text(a.0, b.0));
            CborValue::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (CborValue::Text(k.to_string()), v))
                    .collect(),
            )
        }
        Value::Wrapped { tag, .. } => {
            return Err(CodecError::NotStorable { tag: tag.clone() });
        }
    })
}

/// Text keys encode as header + UTF-8 bytes, so canonical order is
/// length-first, then bytewise.
fn cmp_canonical_text(a: &str, b: &str) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn encode_small_integers() {
        assert_eq!(to_canonical_cbor(&Value::Integer(0)).unwrap(), vec![0x00]);
        assert_eq!(to_canonical_cbor(&Value::Integer(23)).unwrap(), vec![0x17]);
        assert_eq!(
            to_canonical_cbor(&Value::Integer(24)).unwrap(),
            vec![0x18, 24]
        );
        assert_eq!(to_canonical_cbor(&Value::Integer(-1)).unwrap(), vec![0x20]);
    }

    #[test]
    fn encode_simple_values() {
        assert_eq!(to_canonical_cbor(&Value::Null).unwrap(), vec![0xf6]);
        assert_eq!(to_canonical_cbor(&Value::Bool(false)).unwrap(), vec![0xf4]);
        assert_eq!(
            to_canonical_cbor(&Value::from("a")).unwrap(),
            vec![0x61, b'a']
        );
    }

    #[test]
    fn map_keys_length_first() {
        let value = record! { "bb" => 1, "a" => 2, "c" => 3 }.into_value();
        let bytes = to_canonical_cbor(&value).unwrap();
        // a3 | 61 'a' 02 | 61 'c' 03 | 62 'b' 'b' 01
        assert_eq!(
            bytes,
            vec![0xa3, 0x61, b'a', 0x02, 0x61, b'c', 0x03, 0x62, b'b', b'b', 0x01]
        );
    }

    #[test]
    fn wrapped_value_is_rejected() {
        let value = record! { "when" => Value::wrapped("date", 10i64) }.into_value();
        assert_eq!(
            to_canonical_cbor(&value),
            Err(CodecError::NotStorable {
                tag: "date".to_string()
            })
        );
    }
}
