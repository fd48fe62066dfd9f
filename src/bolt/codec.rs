//! Chunked message framing for tokio_util.
//!
//! Every Bolt message travels as a sequence of chunks, each prefixed with
//! a 2-byte big-endian length, terminated by a zero-length chunk. Chunk
//! boundaries carry no meaning; a message may be split anywhere and a
//! chunk never spans two messages.
//!
//! [`ChunkCodec`] works on raw message bodies. [`MessageCodec`] layers the
//! typed [`Request`]/[`Response`] messages on top, encoding for a specific
//! negotiated protocol version.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::error::BoltError;
use super::handshake::Capabilities;
use super::message::{Request, Response};

/// Largest chunk payload a 2-byte length prefix can describe.
pub const MAX_CHUNK_SIZE: usize = 65535;

/// The zero-length chunk that terminates a message.
pub const END_OF_MESSAGE: [u8; 2] = [0x00, 0x00];

/// Default cap on reassembled message size (16MB).
const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Framing codec: reassembles chunked messages into complete bodies and
/// splits outgoing bodies into maximally-sized chunks.
///
/// The reassembly buffer is recycled across messages: `split()` hands the
/// finished body to the caller and keeps the allocation for the next one.
#[derive(Debug)]
pub struct ChunkCodec {
    max_message_size: usize,
    assembly: BytesMut,
}

impl ChunkCodec {
    /// Create a codec with the default message size limit.
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create a codec with a custom message size limit.
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            assembly: BytesMut::with_capacity(4096),
        }
    }

    /// Write `body` as chunks followed by the end-of-message marker.
    fn write_chunked(&self, body: &[u8], dst: &mut BytesMut) {
        dst.reserve(body.len() + 2 * (body.len() / MAX_CHUNK_SIZE + 2));
        for chunk in body.chunks(MAX_CHUNK_SIZE) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&END_OF_MESSAGE);
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkCodec {
    type Item = BytesMut;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }
            let chunk_size = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_size == 0 {
                src.advance(2);
                if self.assembly.is_empty() {
                    // A lone end marker is a NOOP keepalive.
                    continue;
                }
                return Ok(Some(self.assembly.split()));
            }

            if src.len() < 2 + chunk_size {
                return Ok(None);
            }

            if self.assembly.len() + chunk_size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size: self.assembly.len() + chunk_size,
                    max: self.max_message_size,
                });
            }

            src.advance(2);
            self.assembly.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
        }
    }
}

impl Encoder<Bytes> for ChunkCodec {
    type Error = BoltError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write_chunked(&body, dst);
        Ok(())
    }
}

/// Message codec: encodes [`Request`]s and decodes [`Response`]s through
/// the chunked framing, using the message shapes of one negotiated
/// protocol version.
#[derive(Debug)]
pub struct MessageCodec {
    chunker: ChunkCodec,
    capabilities: Capabilities,
}

impl MessageCodec {
    /// Create a codec for the given negotiated capabilities.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            chunker: ChunkCodec::new(),
            capabilities,
        }
    }

    /// The capabilities this codec encodes for.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl Decoder for MessageCodec {
    type Item = Response;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.chunker.decode(src)? {
            Some(body) => Ok(Some(Response::parse(&body)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Request> for MessageCodec {
    type Error = BoltError;

    fn encode(&mut self, request: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = request.encode(self.capabilities)?;
        self.chunker.write_chunked(&body, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::handshake::BoltVersion;
    use crate::bolt::packstream::{Decoder as PackDecoder, Encoder as PackEncoder};

    fn frame(body: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        ChunkCodec::new().write_chunked(body, &mut buf);
        buf
    }

    #[test]
    fn test_single_chunk_roundtrip() {
        let mut codec = ChunkCodec::new();
        let mut buf = frame(b"hello");
        assert_eq!(&buf[..2], &[0x00, 0x05]);
        let body = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&body[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_large_message_splits_into_chunks() {
        let body = vec![0xAB; MAX_CHUNK_SIZE + 10];
        let mut buf = frame(&body);
        // One full chunk, one 10-byte chunk, one end marker.
        assert_eq!(buf.len(), 2 + MAX_CHUNK_SIZE + 2 + 10 + 2);
        assert_eq!(&buf[..2], &[0xFF, 0xFF]);

        let mut codec = ChunkCodec::new();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.len(), body.len());
    }

    #[test]
    fn test_partial_input_returns_none() {
        let full = frame(b"abcdef");
        let mut codec = ChunkCodec::new();
        // Feed the frame one byte at a time; only the last byte completes it.
        let mut buf = BytesMut::new();
        for (i, byte) in full.iter().enumerate() {
            buf.put_u8(*byte);
            let result = codec.decode(&mut buf).unwrap();
            if i + 1 < full.len() {
                assert!(result.is_none(), "completed early at byte {}", i);
            } else {
                assert_eq!(&result.unwrap()[..], b"abcdef");
            }
        }
    }

    #[test]
    fn test_message_split_across_chunks() {
        let mut buf = BytesMut::new();
        buf.put_u16(3);
        buf.put_slice(b"abc");
        buf.put_u16(3);
        buf.put_slice(b"def");
        buf.put_slice(&END_OF_MESSAGE);

        let mut codec = ChunkCodec::new();
        let body = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&body[..], b"abcdef");
    }

    #[test]
    fn test_noop_frames_skipped() {
        let mut buf = BytesMut::new();
        buf.put_slice(&END_OF_MESSAGE);
        buf.put_slice(&END_OF_MESSAGE);
        buf.put_u16(2);
        buf.put_slice(b"ok");
        buf.put_slice(&END_OF_MESSAGE);

        let mut codec = ChunkCodec::new();
        let body = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&body[..], b"ok");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_message_size_limit() {
        let mut codec = ChunkCodec::with_max_message_size(100);
        let mut buf = BytesMut::new();
        buf.put_u16(200);
        buf.put_slice(&[0u8; 200]);
        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(BoltError::MessageTooLarge { size: 200, max: 100 })));
    }

    #[test]
    fn test_multiple_messages_in_one_buffer() {
        let mut buf = BytesMut::new();
        for body in [b"one".as_slice(), b"two", b"three"] {
            buf.extend_from_slice(&frame(body));
        }
        let mut codec = ChunkCodec::new();
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"one");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"two");
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"three");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_message_codec_roundtrips_reset() {
        let mut codec = MessageCodec::new(BoltVersion::V4_3.capabilities());
        let mut buf = BytesMut::new();
        codec.encode(Request::Reset, &mut buf).unwrap();

        // Fake the server echoing a SUCCESS with empty metadata.
        let mut enc = PackEncoder::new();
        enc.write_struct_header(0x70, 1).unwrap();
        enc.write_map_header(0).unwrap();
        let mut reply = frame(enc.as_bytes());
        let response = codec.decode(&mut reply).unwrap().unwrap();
        assert!(matches!(response, Response::Success(_)));
    }

    #[test]
    fn test_chunked_body_is_valid_packstream() {
        // Whatever the chunker does, the reassembled body must decode.
        let mut enc = PackEncoder::new();
        enc.write_string(&"z".repeat(70000)).unwrap();
        let body = enc.into_bytes();

        let mut buf = frame(&body);
        let mut codec = ChunkCodec::new();
        let reassembled = codec.decode(&mut buf).unwrap().unwrap();
        let mut dec = PackDecoder::new(&reassembled);
        let value = dec.decode_value().unwrap();
        assert_eq!(value.as_str().unwrap().len(), 70000);
    }
}
