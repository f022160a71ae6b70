//! Typed payload convenience layer (section 6.2 of the wire contract).
//!
//! deepstream prefixes every JSON-ish argument with a single type byte so a
//! receiver can tell a bare string from a JSON-encoded one without parsing
//! it first. Grounded in
//! `examples/original_source/include/deepstream/lib/type-serializer.hpp`,
//! reimplemented over `serde_json::Value` with one deliberate fix: the
//! original's prefix switch has no `default` case, silently emitting
//! unprefixed garbage for a `Value` variant it doesn't expect. This
//! `match` is exhaustive, so the equivalent mistake doesn't compile.

use serde_json::Value;

const STRING_PREFIX: u8 = b'S';
const OBJECT_PREFIX: u8 = b'O';
const NUMBER_PREFIX: u8 = b'N';
const TRUE_PREFIX: u8 = b'T';
const FALSE_PREFIX: u8 = b'F';
const NULL_PREFIX: u8 = b'L';
const UNDEFINED_PREFIX: u8 = b'U';

/// The type tag carried by a prefixed payload, mirroring the closed set of
/// prefixes the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    String,
    Object,
    Number,
    True,
    False,
    Null,
    Undefined,
}

/// Encode `value` as a type-prefixed byte buffer suitable for use as a
/// message argument.
pub fn to_prefixed_buffer(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => {
            let mut out = vec![STRING_PREFIX];
            out.extend_from_slice(s.as_bytes());
            out
        }
        Value::Number(_) => {
            let mut out = vec![NUMBER_PREFIX];
            out.extend_from_slice(value.to_string().as_bytes());
            out
        }
        Value::Bool(true) => vec![TRUE_PREFIX],
        Value::Bool(false) => vec![FALSE_PREFIX],
        Value::Null => vec![NULL_PREFIX],
        Value::Object(_) | Value::Array(_) => {
            let mut out = vec![OBJECT_PREFIX];
            out.extend_from_slice(value.to_string().as_bytes());
            out
        }
    }
}

/// Encode the protocol's distinct "undefined" sentinel, which has no
/// `serde_json::Value` counterpart.
pub fn undefined_buffer() -> Vec<u8> {
    vec![UNDEFINED_PREFIX]
}

/// Decode a type-prefixed byte buffer back into a `Value`, or `None` for
/// the undefined sentinel (which carries no JSON representation).
pub fn from_prefixed_buffer(buf: &[u8]) -> Option<Value> {
    let (&prefix, rest) = buf.split_first()?;
    match prefix {
        STRING_PREFIX => Some(Value::String(String::from_utf8_lossy(rest).into_owned())),
        OBJECT_PREFIX => serde_json::from_slice(rest).ok(),
        NUMBER_PREFIX => std::str::from_utf8(rest).ok()?.parse::<f64>().ok().and_then(|n| {
            serde_json::Number::from_f64(n).map(Value::Number)
        }),
        TRUE_PREFIX => Some(Value::Bool(true)),
        FALSE_PREFIX => Some(Value::Bool(false)),
        NULL_PREFIX => Some(Value::Null),
        UNDEFINED_PREFIX => None,
        _ => None,
    }
}

pub fn payload_type_of(buf: &[u8]) -> Option<PayloadType> {
    match buf.first()? {
        &STRING_PREFIX => Some(PayloadType::String),
        &OBJECT_PREFIX => Some(PayloadType::Object),
        &NUMBER_PREFIX => Some(PayloadType::Number),
        &TRUE_PREFIX => Some(PayloadType::True),
        &FALSE_PREFIX => Some(PayloadType::False),
        &NULL_PREFIX => Some(PayloadType::Null),
        &UNDEFINED_PREFIX => Some(PayloadType::Undefined),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_string() {
        let v = json!("hello");
        let buf = to_prefixed_buffer(&v);
        assert_eq!(buf[0], STRING_PREFIX);
        assert_eq!(from_prefixed_buffer(&buf), Some(v));
    }

    #[test]
    fn round_trips_object() {
        let v = json!({"a": 1, "b": [1, 2]});
        let buf = to_prefixed_buffer(&v);
        assert_eq!(buf[0], OBJECT_PREFIX);
        assert_eq!(from_prefixed_buffer(&buf), Some(v));
    }

    #[test]
    fn booleans_and_null_use_single_byte_prefixes() {
        assert_eq!(to_prefixed_buffer(&json!(true)), vec![TRUE_PREFIX]);
        assert_eq!(to_prefixed_buffer(&json!(false)), vec![FALSE_PREFIX]);
        assert_eq!(to_prefixed_buffer(&json!(null)), vec![NULL_PREFIX]);
    }

    #[test]
    fn undefined_has_no_value_representation() {
        let buf = undefined_buffer();
        assert_eq!(payload_type_of(&buf), Some(PayloadType::Undefined));
        assert_eq!(from_prefixed_buffer(&buf), None);
    }

    #[test]
    fn payload_type_of_empty_buffer_is_none() {
        assert_eq!(payload_type_of(&[]), None);
    }
}
