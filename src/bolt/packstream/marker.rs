//! PackStream marker bytes and structure signatures.

/// Null value.
pub const NULL: u8 = 0xC0;

/// 64-bit IEEE 754 float.
pub const FLOAT_64: u8 = 0xC1;

/// Booleans.
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

/// Sized integers. Values in `[-16, 127]` are encoded inline as a single
/// byte (the two's-complement ranges `0x00..=0x7F` and `0xF0..=0xFF`).
pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

/// Byte arrays.
pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

/// Strings. Up to 15 bytes fit in the tiny range `0x80..=0x8F`.
pub const TINY_STRING: u8 = 0x80;
pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

/// Lists. Up to 15 elements fit in the tiny range `0x90..=0x9F`.
pub const TINY_LIST: u8 = 0x90;
pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

/// Maps. Up to 15 entries fit in the tiny range `0xA0..=0xAF`.
pub const TINY_MAP: u8 = 0xA0;
pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

/// Structures. Up to 15 fields fit in the tiny range `0xB0..=0xBF`.
pub const TINY_STRUCT: u8 = 0xB0;
pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;

/// Largest size expressible by a tiny marker.
pub const TINY_MAX: usize = 15;

/// Inclusive bounds of the inline integer range.
pub const TINY_INT_MIN: i64 = -16;
pub const TINY_INT_MAX: i64 = 127;

/// Graph structure signatures.
pub mod sig {
    pub const NODE: u8 = 0x4E; // 'N'
    pub const RELATIONSHIP: u8 = 0x52; // 'R'
    pub const UNBOUND_RELATIONSHIP: u8 = 0x72; // 'r'
    pub const PATH: u8 = 0x50; // 'P'

    pub const DATE: u8 = 0x44; // 'D'
    pub const TIME: u8 = 0x54; // 'T'
    pub const LOCAL_TIME: u8 = 0x74; // 't'
    pub const DATE_TIME: u8 = 0x46; // 'F'
    pub const DATE_TIME_ZONE_ID: u8 = 0x66; // 'f'
    pub const LOCAL_DATE_TIME: u8 = 0x64; // 'd'
    pub const DURATION: u8 = 0x45; // 'E'

    pub const POINT_2D: u8 = 0x58; // 'X'
    pub const POINT_3D: u8 = 0x59; // 'Y'
}

/// Whether a marker byte is an inline integer.
#[inline]
pub fn is_tiny_int(marker: u8) -> bool {
    // 0x00..=0x7F or 0xF0..=0xFF
    (marker as i8) >= -16
}

/// The size encoded in a tiny marker's low nibble.
#[inline]
pub fn tiny_size(marker: u8) -> usize {
    (marker & 0x0F) as usize
}
