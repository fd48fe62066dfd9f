//! PackStream serialization.
//!
//! PackStream is the self-describing binary format the Bolt protocol uses
//! for every value crossing the wire. Each value starts with a marker byte
//! that encodes its type and, for small values, its size.
//!
//! The value model is split into a sendable subset (what query parameters
//! may contain) and a receivable superset (what results may contain).
//! Graph structures like [`value::Node`] and [`value::Path`], zoned
//! temporal types and spatial points only ever travel server-to-client;
//! [`Encoder::encode_value`] rejects them.
//!
//! # Value Types
//!
//! | Kind | Sendable | Receivable |
//! |------|----------|------------|
//! | Null, Bool, Integer, Float, String, Bytes | yes | yes |
//! | List, Map | yes | yes |
//! | Date, LocalTime, LocalDateTime, Duration | yes | yes |
//! | Node, Relationship, UnboundRelationship, Path | no | yes |
//! | Time, DateTime, DateTimeZoneId | no | yes |
//! | Point2d, Point3d | no | yes |

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod value;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use value::{Value, ValueMap};

use thiserror::Error;

/// PackStream encode/decode errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    /// Input ended in the middle of a value.
    #[error("unexpected end of PackStream data")]
    UnexpectedEof,

    /// A marker byte that is not part of the format.
    #[error("unknown PackStream marker: 0x{0:02X}")]
    UnknownMarker(u8),

    /// A structure signature this client does not understand.
    #[error("unknown structure signature: 0x{0:02X}")]
    UnknownSignature(u8),

    /// String contents were not valid UTF-8.
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    /// A map key was not a string.
    #[error("map keys must be strings")]
    InvalidMapKey,

    /// A checked map insert saw a key that is already present.
    #[error("duplicate map key: {0}")]
    DuplicateKey(String),

    /// A value exceeds what its length prefix can express.
    #[error("{0} too large to encode: {1} items")]
    ValueTooLarge(&'static str, usize),

    /// A structure had the wrong field count or malformed contents.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// A receive-only value appeared where a sendable one is required.
    #[error("{0} values cannot be sent to the server")]
    ValueNotSendable(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::value::{Date, Duration, LocalDateTime};

    fn roundtrip(value: &Value) -> Value {
        let mut enc = Encoder::new();
        enc.encode_value(value).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let decoded = dec.decode_value().unwrap();
        assert!(dec.is_exhausted(), "trailing bytes after {:?}", value);
        decoded
    }

    #[test]
    fn test_roundtrip_scalars() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::Float(3.14159),
            Value::String(String::new()),
            Value::String("hello".into()),
            Value::Bytes(vec![0xDE, 0xAD]),
        ] {
            assert_eq!(roundtrip(&value), value);
        }
    }

    #[test]
    fn test_roundtrip_integer_widths() {
        for v in [0i64, 1, -1, 127, -16, -17, 128, i16::MAX as i64, -40000, i32::MAX as i64, i64::MAX, i64::MIN] {
            assert_eq!(roundtrip(&Value::Integer(v)), Value::Integer(v), "width for {}", v);
        }
    }

    #[test]
    fn test_roundtrip_collections() {
        let mut map = ValueMap::new();
        map.insert("name", Value::String("Alice".into())).unwrap();
        map.insert("age", Value::Integer(32)).unwrap();
        let value = Value::List(vec![
            Value::Integer(1),
            Value::Map(map),
            Value::List(vec![Value::Null]),
        ]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_roundtrip_sendable_temporal() {
        for value in [
            Value::Date(Date { days: 18628 }),
            Value::LocalDateTime(LocalDateTime { seconds: 1_600_000_000, nanoseconds: 42 }),
            Value::Duration(Duration { months: 1, days: 2, seconds: 3, nanoseconds: 4 }),
        ] {
            assert_eq!(roundtrip(&value), value);
        }
    }

    #[test]
    fn test_long_string_and_list() {
        let s = "x".repeat(300);
        assert_eq!(roundtrip(&Value::String(s.clone())), Value::String(s));
        let l: Vec<Value> = (0..20).map(Value::Integer).collect();
        assert_eq!(roundtrip(&Value::List(l.clone())), Value::List(l));
    }
}
