//! Bolt version handshake and per-version capability lookup.
//!
//! A connection opens with a 20-byte client handshake: the 4-byte magic
//! preamble followed by four 4-byte big-endian version proposals, ordered
//! by preference. The server replies with the 4 bytes of the version it
//! selected, or all zeroes if none matched.

use std::fmt;

use super::error::HandshakeError;

/// Magic preamble that opens every Bolt connection.
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Size of the client handshake message (magic + 4 version words).
pub const HANDSHAKE_SIZE: usize = 20;

/// Size of the server handshake response.
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// Protocol versions this client can speak.
///
/// Version words are 4-byte big-endian integers with the major version in
/// the high half and the minor version in the low half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum BoltVersion {
    /// Bolt 1 - INIT-style auth, PULL_ALL, ACK_FAILURE recovery.
    V1 = 0x0000_0001,
    /// Bolt 4.0 - HELLO, PULL with extra map, qid multiplexing, RESET.
    V4_0 = 0x0004_0000,
    /// Bolt 4.1 - adds routing context to HELLO.
    V4_1 = 0x0004_0001,
    /// Bolt 4.3 - current Memgraph default.
    V4_3 = 0x0004_0003,
}

impl BoltVersion {
    /// Versions proposed during the handshake, newest first. Exactly four
    /// slots are sent; unused slots would be zero-filled.
    pub const PROPOSED: [BoltVersion; 4] = [
        BoltVersion::V4_3,
        BoltVersion::V4_1,
        BoltVersion::V4_0,
        BoltVersion::V1,
    ];

    /// Parse a raw version word.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0000_0001 => Some(BoltVersion::V1),
            0x0004_0000 => Some(BoltVersion::V4_0),
            0x0004_0001 => Some(BoltVersion::V4_1),
            0x0004_0003 => Some(BoltVersion::V4_3),
            _ => None,
        }
    }

    /// The raw version word.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Major version number.
    pub fn major(self) -> u16 {
        ((self as u32) >> 16) as u16
    }

    /// Minor version number.
    pub fn minor(self) -> u16 {
        ((self as u32) & 0xFFFF) as u16
    }

    /// The big-endian wire form of the version word.
    pub fn to_bytes(self) -> [u8; 4] {
        (self as u32).to_be_bytes()
    }

    /// Parse the big-endian wire form.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        Self::from_u32(u32::from_be_bytes(bytes))
    }

    /// What this version can do. Message construction and the session
    /// state machine branch on these flags rather than on version
    /// comparisons.
    pub fn capabilities(self) -> Capabilities {
        match self {
            BoltVersion::V1 => Capabilities {
                init_style_auth: true,
                pull_has_extra: false,
                multiplexing: false,
                has_more: false,
                reset_recovery: false,
                hello_routing: false,
            },
            BoltVersion::V4_0 => Capabilities {
                init_style_auth: false,
                pull_has_extra: true,
                multiplexing: true,
                has_more: true,
                reset_recovery: true,
                hello_routing: false,
            },
            BoltVersion::V4_1 | BoltVersion::V4_3 => Capabilities {
                init_style_auth: false,
                pull_has_extra: true,
                multiplexing: true,
                has_more: true,
                reset_recovery: true,
                hello_routing: true,
            },
        }
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

/// Per-version capability table.
///
/// Versions differ in message shapes and recovery protocol; collecting
/// the differences here keeps the state machine free of version-number
/// comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Authentication uses the two-field INIT message (client name +
    /// auth map) rather than the single-map HELLO.
    pub init_style_auth: bool,
    /// PULL carries an extra map with `n` and optional `qid`; without
    /// this, PULL_ALL with no fields is sent and all rows stream back.
    pub pull_has_extra: bool,
    /// Multiple queries may be open concurrently under an explicit
    /// transaction, addressed by server-assigned qid.
    pub multiplexing: bool,
    /// SUCCESS summaries may carry the `has_more` flag after a bounded
    /// PULL.
    pub has_more: bool,
    /// Failure recovery sends RESET; without this, ACK_FAILURE.
    pub reset_recovery: bool,
    /// HELLO's extra map carries a routing context entry.
    pub hello_routing: bool,
}

/// Build the 20-byte client handshake message.
pub fn build_handshake() -> [u8; HANDSHAKE_SIZE] {
    let mut data = [0u8; HANDSHAKE_SIZE];
    data[0..4].copy_from_slice(&BOLT_MAGIC);
    for (i, version) in BoltVersion::PROPOSED.iter().enumerate() {
        let offset = 4 + i * 4;
        data[offset..offset + 4].copy_from_slice(&version.to_bytes());
    }
    data
}

/// Interpret the server's 4-byte handshake response.
pub fn parse_handshake_response(
    response: [u8; HANDSHAKE_RESPONSE_SIZE],
) -> Result<BoltVersion, HandshakeError> {
    let word = u32::from_be_bytes(response);
    if word == 0 {
        return Err(HandshakeError::NoCompatibleVersion);
    }
    BoltVersion::from_u32(word).ok_or(HandshakeError::UnsupportedVersion(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_words() {
        assert_eq!(BoltVersion::V1.as_u32(), 0x0000_0001);
        assert_eq!(BoltVersion::V4_0.as_u32(), 0x0004_0000);
        assert_eq!(BoltVersion::V4_1.as_u32(), 0x0004_0001);
        assert_eq!(BoltVersion::V4_3.as_u32(), 0x0004_0003);
    }

    #[test]
    fn test_major_minor() {
        assert_eq!(BoltVersion::V1.major(), 0);
        assert_eq!(BoltVersion::V1.minor(), 1);
        assert_eq!(BoltVersion::V4_3.major(), 4);
        assert_eq!(BoltVersion::V4_3.minor(), 3);
    }

    #[test]
    fn test_version_bytes_roundtrip() {
        for v in BoltVersion::PROPOSED {
            assert_eq!(BoltVersion::from_bytes(v.to_bytes()), Some(v));
        }
        assert_eq!(BoltVersion::from_bytes([0, 3, 0, 0]), None);
    }

    #[test]
    fn test_handshake_layout() {
        let data = build_handshake();
        assert_eq!(&data[0..4], &BOLT_MAGIC);
        assert_eq!(&data[4..8], &[0x00, 0x04, 0x00, 0x03]); // 4.3
        assert_eq!(&data[8..12], &[0x00, 0x04, 0x00, 0x01]); // 4.1
        assert_eq!(&data[12..16], &[0x00, 0x04, 0x00, 0x00]); // 4.0
        assert_eq!(&data[16..20], &[0x00, 0x00, 0x00, 0x01]); // 1.0
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(
            parse_handshake_response([0x00, 0x04, 0x00, 0x03]),
            Ok(BoltVersion::V4_3)
        );
        assert_eq!(
            parse_handshake_response([0x00, 0x00, 0x00, 0x01]),
            Ok(BoltVersion::V1)
        );
        assert_eq!(
            parse_handshake_response([0x00, 0x00, 0x00, 0x00]),
            Err(HandshakeError::NoCompatibleVersion)
        );
        assert_eq!(
            parse_handshake_response([0x00, 0x05, 0x00, 0x00]),
            Err(HandshakeError::UnsupportedVersion(0x0005_0000))
        );
    }

    #[test]
    fn test_capability_table() {
        let v1 = BoltVersion::V1.capabilities();
        assert!(v1.init_style_auth);
        assert!(!v1.pull_has_extra);
        assert!(!v1.multiplexing);
        assert!(!v1.reset_recovery);

        let v40 = BoltVersion::V4_0.capabilities();
        assert!(!v40.init_style_auth);
        assert!(v40.pull_has_extra);
        assert!(v40.multiplexing);
        assert!(v40.has_more);
        assert!(v40.reset_recovery);
        assert!(!v40.hello_routing);

        assert!(BoltVersion::V4_1.capabilities().hello_routing);
        assert!(BoltVersion::V4_3.capabilities().hello_routing);
    }

    #[test]
    fn test_version_ordering() {
        assert!(BoltVersion::V4_3 > BoltVersion::V4_1);
        assert!(BoltVersion::V4_1 > BoltVersion::V4_0);
        assert!(BoltVersion::V4_0 > BoltVersion::V1);
    }

    #[test]
    fn test_display() {
        assert_eq!(BoltVersion::V1.to_string(), "0.1");
        assert_eq!(BoltVersion::V4_3.to_string(), "4.3");
    }
}
