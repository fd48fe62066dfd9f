//! PackStream decoder.

use super::marker::{self, *};
use super::value::{
    Date, DateTime, DateTimeZoneId, Duration, LocalDateTime, LocalTime, Node, Path, Point2d,
    Point3d, Relationship, Time, UnboundRelationship, Value, ValueMap,
};
use super::PackError;

/// A cursor over a complete PackStream message.
///
/// Structures with known signatures decode into their typed [`Value`]
/// variants; an unknown signature fails the decode rather than producing
/// an opaque value. The message layer reads the top-level structure
/// header itself via [`Decoder::read_struct_header`], since message tags
/// are not value signatures.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over a byte slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether all input has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn read_u8(&mut self) -> Result<u8, PackError> {
        let b = *self.buf.get(self.pos).ok_or(PackError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], PackError> {
        let end = self.pos.checked_add(len).ok_or(PackError::UnexpectedEof)?;
        let slice = self.buf.get(self.pos..end).ok_or(PackError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u16(&mut self) -> Result<u16, PackError> {
        let b = self.read_slice(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, PackError> {
        let b = self.read_slice(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64_wide(&mut self, width: u8) -> Result<i64, PackError> {
        Ok(match width {
            INT_8 => self.read_u8()? as i8 as i64,
            INT_16 => self.read_u16()? as i16 as i64,
            INT_32 => self.read_u32()? as i32 as i64,
            _ => {
                let b = self.read_slice(8)?;
                i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
        })
    }

    /// Read a structure header, returning its signature and field count.
    pub fn read_struct_header(&mut self) -> Result<(u8, usize), PackError> {
        let m = self.read_u8()?;
        let fields = match m {
            _ if (TINY_STRUCT..=TINY_STRUCT + TINY_MAX as u8).contains(&m) => marker::tiny_size(m),
            STRUCT_8 => self.read_u8()? as usize,
            STRUCT_16 => self.read_u16()? as usize,
            _ => return Err(PackError::UnknownMarker(m)),
        };
        let signature = self.read_u8()?;
        Ok((signature, fields))
    }

    /// Decode the next value.
    pub fn decode_value(&mut self) -> Result<Value, PackError> {
        let m = self.read_u8()?;
        if is_tiny_int(m) {
            return Ok(Value::Integer(m as i8 as i64));
        }
        Ok(match m {
            NULL => Value::Null,
            TRUE => Value::Bool(true),
            FALSE => Value::Bool(false),
            FLOAT_64 => {
                let b = self.read_slice(8)?;
                Value::Float(f64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            }
            INT_8 | INT_16 | INT_32 | INT_64 => Value::Integer(self.read_i64_wide(m)?),
            _ if (TINY_STRING..=TINY_STRING + TINY_MAX as u8).contains(&m) => {
                Value::String(self.read_string_body(marker::tiny_size(m))?)
            }
            STRING_8 => {
                let len = self.read_u8()? as usize;
                Value::String(self.read_string_body(len)?)
            }
            STRING_16 => {
                let len = self.read_u16()? as usize;
                Value::String(self.read_string_body(len)?)
            }
            STRING_32 => {
                let len = self.read_u32()? as usize;
                Value::String(self.read_string_body(len)?)
            }
            BYTES_8 => {
                let len = self.read_u8()? as usize;
                Value::Bytes(self.read_slice(len)?.to_vec())
            }
            BYTES_16 => {
                let len = self.read_u16()? as usize;
                Value::Bytes(self.read_slice(len)?.to_vec())
            }
            BYTES_32 => {
                let len = self.read_u32()? as usize;
                Value::Bytes(self.read_slice(len)?.to_vec())
            }
            _ if (TINY_LIST..=TINY_LIST + TINY_MAX as u8).contains(&m) => {
                self.decode_list(marker::tiny_size(m))?
            }
            LIST_8 => {
                let len = self.read_u8()? as usize;
                self.decode_list(len)?
            }
            LIST_16 => {
                let len = self.read_u16()? as usize;
                self.decode_list(len)?
            }
            LIST_32 => {
                let len = self.read_u32()? as usize;
                self.decode_list(len)?
            }
            _ if (TINY_MAP..=TINY_MAP + TINY_MAX as u8).contains(&m) => {
                Value::Map(self.decode_map(marker::tiny_size(m))?)
            }
            MAP_8 => {
                let len = self.read_u8()? as usize;
                Value::Map(self.decode_map(len)?)
            }
            MAP_16 => {
                let len = self.read_u16()? as usize;
                Value::Map(self.decode_map(len)?)
            }
            MAP_32 => {
                let len = self.read_u32()? as usize;
                Value::Map(self.decode_map(len)?)
            }
            _ if (TINY_STRUCT..=TINY_STRUCT + TINY_MAX as u8).contains(&m) => {
                let signature = self.read_u8()?;
                self.decode_struct(signature, marker::tiny_size(m))?
            }
            STRUCT_8 => {
                let fields = self.read_u8()? as usize;
                let signature = self.read_u8()?;
                self.decode_struct(signature, fields)?
            }
            STRUCT_16 => {
                let fields = self.read_u16()? as usize;
                let signature = self.read_u8()?;
                self.decode_struct(signature, fields)?
            }
            _ => return Err(PackError::UnknownMarker(m)),
        })
    }

    fn read_string_body(&mut self, len: usize) -> Result<String, PackError> {
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| PackError::InvalidUtf8)
    }

    fn decode_list(&mut self, len: usize) -> Result<Value, PackError> {
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode_value()?);
        }
        Ok(Value::List(items))
    }

    fn decode_map(&mut self, len: usize) -> Result<ValueMap, PackError> {
        let mut map = ValueMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = match self.decode_value()? {
                Value::String(s) => s,
                _ => return Err(PackError::InvalidMapKey),
            };
            let value = self.decode_value()?;
            map.insert_unchecked(key, value);
        }
        Ok(map)
    }

    fn decode_struct(&mut self, signature: u8, fields: usize) -> Result<Value, PackError> {
        let expect = |want: usize| {
            if fields == want {
                Ok(())
            } else {
                Err(PackError::InvalidStructure(format!(
                    "signature 0x{:02X} expects {} fields, got {}",
                    signature, want, fields
                )))
            }
        };
        Ok(match signature {
            sig::NODE => {
                expect(3)?;
                Value::Node(Node {
                    id: self.field_int("node id")?,
                    labels: self.field_string_list("node labels")?,
                    properties: self.field_map("node properties")?,
                })
            }
            sig::RELATIONSHIP => {
                expect(5)?;
                Value::Relationship(Relationship {
                    id: self.field_int("relationship id")?,
                    start_id: self.field_int("relationship start")?,
                    end_id: self.field_int("relationship end")?,
                    type_: self.field_string("relationship type")?,
                    properties: self.field_map("relationship properties")?,
                })
            }
            sig::UNBOUND_RELATIONSHIP => {
                expect(3)?;
                Value::UnboundRelationship(UnboundRelationship {
                    id: self.field_int("relationship id")?,
                    type_: self.field_string("relationship type")?,
                    properties: self.field_map("relationship properties")?,
                })
            }
            sig::PATH => {
                expect(3)?;
                self.decode_path()?
            }
            sig::DATE => {
                expect(1)?;
                Value::Date(Date {
                    days: self.field_int("date days")?,
                })
            }
            sig::TIME => {
                expect(2)?;
                Value::Time(Time {
                    nanoseconds: self.field_int("time nanoseconds")?,
                    tz_offset_seconds: self.field_int("time offset")?,
                })
            }
            sig::LOCAL_TIME => {
                expect(1)?;
                Value::LocalTime(LocalTime {
                    nanoseconds: self.field_int("local time nanoseconds")?,
                })
            }
            sig::DATE_TIME => {
                expect(3)?;
                Value::DateTime(DateTime {
                    seconds: self.field_int("date time seconds")?,
                    nanoseconds: self.field_int("date time nanoseconds")?,
                    tz_offset_seconds: self.field_int("date time offset")?,
                })
            }
            sig::DATE_TIME_ZONE_ID => {
                expect(3)?;
                Value::DateTimeZoneId(DateTimeZoneId {
                    seconds: self.field_int("zoned date time seconds")?,
                    nanoseconds: self.field_int("zoned date time nanoseconds")?,
                    tz_id: self.field_string("zoned date time zone id")?,
                })
            }
            sig::LOCAL_DATE_TIME => {
                expect(2)?;
                Value::LocalDateTime(LocalDateTime {
                    seconds: self.field_int("local date time seconds")?,
                    nanoseconds: self.field_int("local date time nanoseconds")?,
                })
            }
            sig::DURATION => {
                expect(4)?;
                Value::Duration(Duration {
                    months: self.field_int("duration months")?,
                    days: self.field_int("duration days")?,
                    seconds: self.field_int("duration seconds")?,
                    nanoseconds: self.field_int("duration nanoseconds")?,
                })
            }
            sig::POINT_2D => {
                expect(3)?;
                Value::Point2d(Point2d {
                    srid: self.field_int("point srid")?,
                    x: self.field_float("point x")?,
                    y: self.field_float("point y")?,
                })
            }
            sig::POINT_3D => {
                expect(4)?;
                Value::Point3d(Point3d {
                    srid: self.field_int("point srid")?,
                    x: self.field_float("point x")?,
                    y: self.field_float("point y")?,
                    z: self.field_float("point z")?,
                })
            }
            _ => return Err(PackError::UnknownSignature(signature)),
        })
    }

    fn decode_path(&mut self) -> Result<Value, PackError> {
        let nodes = match self.decode_value()? {
            Value::List(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::Node(n) => Ok(n),
                    other => Err(PackError::InvalidStructure(format!(
                        "path nodes must be nodes, got {}",
                        other.kind()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(PackError::InvalidStructure(format!(
                    "path nodes must be a list, got {}",
                    other.kind()
                )))
            }
        };
        let relationships = match self.decode_value()? {
            Value::List(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::UnboundRelationship(r) => Ok(r),
                    other => Err(PackError::InvalidStructure(format!(
                        "path relationships must be unbound relationships, got {}",
                        other.kind()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(PackError::InvalidStructure(format!(
                    "path relationships must be a list, got {}",
                    other.kind()
                )))
            }
        };
        let indices = match self.decode_value()? {
            Value::List(items) => items
                .into_iter()
                .map(|v| {
                    v.as_int().ok_or_else(|| {
                        PackError::InvalidStructure("path indices must be integers".into())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(PackError::InvalidStructure(format!(
                    "path indices must be a list, got {}",
                    other.kind()
                )))
            }
        };

        if nodes.is_empty() {
            return Err(PackError::InvalidStructure(
                "path must contain at least one node".into(),
            ));
        }
        if indices.len() % 2 != 0 {
            return Err(PackError::InvalidStructure(
                "path indices must come in pairs".into(),
            ));
        }
        for pair in indices.chunks(2) {
            let (rel_ref, node_ref) = (pair[0], pair[1]);
            if rel_ref == 0 || rel_ref.unsigned_abs() as usize > relationships.len() {
                return Err(PackError::InvalidStructure(format!(
                    "path relationship reference {} out of range",
                    rel_ref
                )));
            }
            if node_ref < 0 || node_ref as usize >= nodes.len() {
                return Err(PackError::InvalidStructure(format!(
                    "path node reference {} out of range",
                    node_ref
                )));
            }
        }

        Ok(Value::Path(Path {
            nodes,
            relationships,
            indices,
        }))
    }

    fn field_int(&mut self, what: &'static str) -> Result<i64, PackError> {
        match self.decode_value()? {
            Value::Integer(i) => Ok(i),
            other => Err(PackError::InvalidStructure(format!(
                "{} must be an integer, got {}",
                what,
                other.kind()
            ))),
        }
    }

    fn field_float(&mut self, what: &'static str) -> Result<f64, PackError> {
        match self.decode_value()? {
            Value::Float(f) => Ok(f),
            other => Err(PackError::InvalidStructure(format!(
                "{} must be a float, got {}",
                what,
                other.kind()
            ))),
        }
    }

    fn field_string(&mut self, what: &'static str) -> Result<String, PackError> {
        match self.decode_value()? {
            Value::String(s) => Ok(s),
            other => Err(PackError::InvalidStructure(format!(
                "{} must be a string, got {}",
                what,
                other.kind()
            ))),
        }
    }

    fn field_string_list(&mut self, what: &'static str) -> Result<Vec<String>, PackError> {
        match self.decode_value()? {
            Value::List(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    other => Err(PackError::InvalidStructure(format!(
                        "{} must contain strings, got {}",
                        what,
                        other.kind()
                    ))),
                })
                .collect(),
            other => Err(PackError::InvalidStructure(format!(
                "{} must be a list, got {}",
                what,
                other.kind()
            ))),
        }
    }

    fn field_map(&mut self, what: &'static str) -> Result<ValueMap, PackError> {
        match self.decode_value()? {
            Value::Map(m) => Ok(m),
            other => Err(PackError::InvalidStructure(format!(
                "{} must be a map, got {}",
                what,
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Value, PackError> {
        let mut dec = Decoder::new(bytes);
        let value = dec.decode_value()?;
        assert!(dec.is_exhausted());
        Ok(value)
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(&[0xC0]).unwrap(), Value::Null);
        assert_eq!(decode(&[0xC3]).unwrap(), Value::Bool(true));
        assert_eq!(decode(&[0xC2]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[0x2A]).unwrap(), Value::Integer(42));
        assert_eq!(decode(&[0xF0]).unwrap(), Value::Integer(-16));
        assert_eq!(decode(&[0xC8, 0x80]).unwrap(), Value::Integer(-128));
        assert_eq!(decode(&[0xC9, 0x03, 0xE8]).unwrap(), Value::Integer(1000));
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(
            decode(b"\x85hello").unwrap(),
            Value::String("hello".into())
        );
        assert_eq!(decode(&[0x80]).unwrap(), Value::String(String::new()));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(decode(&[0x82, 0xFF, 0xFE]), Err(PackError::InvalidUtf8));
    }

    #[test]
    fn test_decode_truncated_input() {
        assert_eq!(decode(&[]), Err(PackError::UnexpectedEof));
        assert_eq!(decode(&[0xC9, 0x03]), Err(PackError::UnexpectedEof));
        assert_eq!(decode(&[0x85, b'h', b'i']), Err(PackError::UnexpectedEof));
        assert_eq!(decode(&[0x92, 0x01]), Err(PackError::UnexpectedEof));
    }

    #[test]
    fn test_decode_unknown_marker() {
        assert_eq!(decode(&[0xC7]), Err(PackError::UnknownMarker(0xC7)));
    }

    #[test]
    fn test_decode_list_and_map() {
        // [1, "a"]
        let value = decode(&[0x92, 0x01, 0x81, b'a']).unwrap();
        assert_eq!(
            value,
            Value::List(vec![Value::Integer(1), Value::String("a".into())])
        );

        // {"k": true}
        let value = decode(&[0xA1, 0x81, b'k', 0xC3]).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("k"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_decode_map_non_string_key() {
        assert_eq!(
            decode(&[0xA1, 0x01, 0xC3]),
            Err(PackError::InvalidMapKey)
        );
    }

    #[test]
    fn test_decode_node() {
        // Node(id=1, labels=["L"], properties={})
        let bytes = [0xB3, 0x4E, 0x01, 0x91, 0x81, b'L', 0xA0];
        let value = decode(&bytes).unwrap();
        let node = value.as_node().unwrap();
        assert_eq!(node.id, 1);
        assert_eq!(node.labels, ["L"]);
        assert!(node.properties.is_empty());
    }

    #[test]
    fn test_decode_node_wrong_field_count() {
        let bytes = [0xB2, 0x4E, 0x01, 0x90];
        assert!(matches!(
            decode(&bytes),
            Err(PackError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_decode_unknown_signature() {
        let bytes = [0xB1, 0x7A, 0x01];
        assert_eq!(decode(&bytes), Err(PackError::UnknownSignature(0x7A)));
    }

    #[test]
    fn test_decode_path() {
        // Two nodes, one relationship, walk (n0)-[r0]->(n1).
        let bytes = [
            0xB3, 0x50, // Path, 3 fields
            0x92, // nodes
            0xB3, 0x4E, 0x00, 0x90, 0xA0, // Node(0)
            0xB3, 0x4E, 0x01, 0x90, 0xA0, // Node(1)
            0x91, // relationships
            0xB3, 0x72, 0x05, 0x81, b'R', 0xA0, // UnboundRelationship(5, "R")
            0x92, 0x01, 0x01, // indices [1, 1]
        ];
        let value = decode(&bytes).unwrap();
        let path = value.as_path().unwrap();
        assert_eq!(path.hop_count(), 1);
        assert_eq!(path.start().unwrap().id, 0);
        let hop = path.hops().next().unwrap().unwrap();
        assert_eq!(hop.relationship.id, 5);
        assert_eq!(hop.node.id, 1);
    }

    #[test]
    fn test_decode_path_bad_references() {
        // Relationship reference 2 with only one relationship in the pool.
        let bytes = [
            0xB3, 0x50,
            0x92,
            0xB3, 0x4E, 0x00, 0x90, 0xA0,
            0xB3, 0x4E, 0x01, 0x90, 0xA0,
            0x91,
            0xB3, 0x72, 0x05, 0x81, b'R', 0xA0,
            0x92, 0x02, 0x01,
        ];
        assert!(matches!(decode(&bytes), Err(PackError::InvalidStructure(_))));

        // Zero relationship reference.
        let bytes = [
            0xB3, 0x50,
            0x92,
            0xB3, 0x4E, 0x00, 0x90, 0xA0,
            0xB3, 0x4E, 0x01, 0x90, 0xA0,
            0x91,
            0xB3, 0x72, 0x05, 0x81, b'R', 0xA0,
            0x92, 0x00, 0x01,
        ];
        assert!(matches!(decode(&bytes), Err(PackError::InvalidStructure(_))));

        // Odd index count.
        let bytes = [
            0xB3, 0x50,
            0x91,
            0xB3, 0x4E, 0x00, 0x90, 0xA0,
            0x91,
            0xB3, 0x72, 0x05, 0x81, b'R', 0xA0,
            0x91, 0x01,
        ];
        assert!(matches!(decode(&bytes), Err(PackError::InvalidStructure(_))));
    }

    #[test]
    fn test_decode_temporal_structs() {
        // Date(18628)
        let value = decode(&[0xB1, 0x44, 0xC9, 0x48, 0xC4]).unwrap();
        assert_eq!(value, Value::Date(Date { days: 18628 }));

        // Duration(1, 2, 3, 4)
        let value = decode(&[0xB4, 0x45, 0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(
            value,
            Value::Duration(Duration {
                months: 1,
                days: 2,
                seconds: 3,
                nanoseconds: 4
            })
        );
    }

    #[test]
    fn test_decode_point() {
        let mut bytes = vec![0xB3, 0x58, 0xC9, 0x10, 0xE6]; // srid 4326
        bytes.push(0xC1);
        bytes.extend_from_slice(&1.5f64.to_be_bytes());
        bytes.push(0xC1);
        bytes.extend_from_slice(&(-2.5f64).to_be_bytes());
        let value = decode(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Point2d(Point2d {
                srid: 4326,
                x: 1.5,
                y: -2.5
            })
        );
    }

    #[test]
    fn test_read_struct_header() {
        let mut dec = Decoder::new(&[0xB3, 0x70]);
        assert_eq!(dec.read_struct_header().unwrap(), (0x70, 3));

        let mut dec = Decoder::new(&[0xDC, 0x10, 0x71]);
        assert_eq!(dec.read_struct_header().unwrap(), (0x71, 16));
    }
}
