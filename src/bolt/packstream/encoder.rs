//! PackStream encoder.

use bytes::{BufMut, BytesMut};

use super::marker::*;
use super::value::{Value, ValueMap};
use super::PackError;

/// Writes PackStream values into a byte buffer.
///
/// Only the sendable subset of [`Value`] can be encoded; graph
/// structures and the other receive-only kinds are rejected with
/// [`PackError::ValueNotSendable`]. The message layer uses
/// [`Encoder::write_struct_header`] and the typed write methods directly
/// to emit request structures.
pub struct Encoder {
    buffer: BytesMut,
}

impl Encoder {
    /// Create an encoder with a small default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an encoder with the given buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the encoder, returning its buffer.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Encode any sendable value.
    pub fn encode_value(&mut self, value: &Value) -> Result<(), PackError> {
        match value {
            Value::Null => self.write_null(),
            Value::Bool(b) => self.write_bool(*b),
            Value::Integer(i) => self.write_int(*i),
            Value::Float(f) => self.write_float(*f),
            Value::String(s) => self.write_string(s)?,
            Value::Bytes(b) => self.write_bytes(b)?,
            Value::List(items) => {
                self.write_list_header(items.len())?;
                for item in items {
                    self.encode_value(item)?;
                }
            }
            Value::Map(map) => self.write_map(map)?,
            Value::Date(d) => {
                self.write_struct_header(sig::DATE, 1)?;
                self.write_int(d.days);
            }
            Value::LocalTime(t) => {
                self.write_struct_header(sig::LOCAL_TIME, 1)?;
                self.write_int(t.nanoseconds);
            }
            Value::LocalDateTime(dt) => {
                self.write_struct_header(sig::LOCAL_DATE_TIME, 2)?;
                self.write_int(dt.seconds);
                self.write_int(dt.nanoseconds);
            }
            Value::Duration(d) => {
                self.write_struct_header(sig::DURATION, 4)?;
                self.write_int(d.months);
                self.write_int(d.days);
                self.write_int(d.seconds);
                self.write_int(d.nanoseconds);
            }
            receive_only => return Err(PackError::ValueNotSendable(receive_only.kind())),
        }
        Ok(())
    }

    /// Write a null marker.
    pub fn write_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Write an integer in its smallest representation.
    pub fn write_int(&mut self, value: i64) {
        if (TINY_INT_MIN..=TINY_INT_MAX).contains(&value) {
            self.buffer.put_u8(value as u8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(v);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Write a 64-bit float.
    pub fn write_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Write a string.
    pub fn write_string(&mut self, value: &str) -> Result<(), PackError> {
        let bytes = value.as_bytes();
        match bytes.len() {
            len @ 0..=TINY_MAX => self.buffer.put_u8(TINY_STRING + len as u8),
            len if len <= u8::MAX as usize => {
                self.buffer.put_u8(STRING_8);
                self.buffer.put_u8(len as u8);
            }
            len if len <= u16::MAX as usize => {
                self.buffer.put_u8(STRING_16);
                self.buffer.put_u16(len as u16);
            }
            len if len <= u32::MAX as usize => {
                self.buffer.put_u8(STRING_32);
                self.buffer.put_u32(len as u32);
            }
            len => return Err(PackError::ValueTooLarge("string", len)),
        }
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Write a byte array.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), PackError> {
        match value.len() {
            len if len <= u8::MAX as usize => {
                self.buffer.put_u8(BYTES_8);
                self.buffer.put_u8(len as u8);
            }
            len if len <= u16::MAX as usize => {
                self.buffer.put_u8(BYTES_16);
                self.buffer.put_u16(len as u16);
            }
            len if len <= u32::MAX as usize => {
                self.buffer.put_u8(BYTES_32);
                self.buffer.put_u32(len as u32);
            }
            len => return Err(PackError::ValueTooLarge("bytes", len)),
        }
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Write a list length prefix; the caller encodes the elements.
    pub fn write_list_header(&mut self, len: usize) -> Result<(), PackError> {
        match len {
            0..=TINY_MAX => self.buffer.put_u8(TINY_LIST + len as u8),
            _ if len <= u8::MAX as usize => {
                self.buffer.put_u8(LIST_8);
                self.buffer.put_u8(len as u8);
            }
            _ if len <= u16::MAX as usize => {
                self.buffer.put_u8(LIST_16);
                self.buffer.put_u16(len as u16);
            }
            _ if len <= u32::MAX as usize => {
                self.buffer.put_u8(LIST_32);
                self.buffer.put_u32(len as u32);
            }
            _ => return Err(PackError::ValueTooLarge("list", len)),
        }
        Ok(())
    }

    /// Write a full map.
    pub fn write_map(&mut self, map: &ValueMap) -> Result<(), PackError> {
        self.write_map_header(map.len())?;
        for (key, value) in map.iter() {
            self.write_string(key)?;
            self.encode_value(value)?;
        }
        Ok(())
    }

    /// Write a map entry-count prefix; the caller encodes the entries.
    pub fn write_map_header(&mut self, len: usize) -> Result<(), PackError> {
        match len {
            0..=TINY_MAX => self.buffer.put_u8(TINY_MAP + len as u8),
            _ if len <= u8::MAX as usize => {
                self.buffer.put_u8(MAP_8);
                self.buffer.put_u8(len as u8);
            }
            _ if len <= u16::MAX as usize => {
                self.buffer.put_u8(MAP_16);
                self.buffer.put_u16(len as u16);
            }
            _ if len <= u32::MAX as usize => {
                self.buffer.put_u8(MAP_32);
                self.buffer.put_u32(len as u32);
            }
            _ => return Err(PackError::ValueTooLarge("map", len)),
        }
        Ok(())
    }

    /// Write a structure header; the caller encodes the fields.
    pub fn write_struct_header(&mut self, signature: u8, fields: usize) -> Result<(), PackError> {
        match fields {
            0..=TINY_MAX => self.buffer.put_u8(TINY_STRUCT + fields as u8),
            _ if fields <= u8::MAX as usize => {
                self.buffer.put_u8(STRUCT_8);
                self.buffer.put_u8(fields as u8);
            }
            _ if fields <= u16::MAX as usize => {
                self.buffer.put_u8(STRUCT_16);
                self.buffer.put_u16(fields as u16);
            }
            _ => return Err(PackError::ValueTooLarge("structure", fields)),
        }
        self.buffer.put_u8(signature);
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
