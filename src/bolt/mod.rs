//! # Bolt Protocol Implementation
//!
//! Low-level client implementation of the Bolt protocol as spoken by
//! Memgraph-compatible graph database servers.
//!
//! ## Overview
//!
//! - **PackStream** - Self-describing binary serialization for all value
//!   types, including graph, temporal and spatial structures
//! - **Chunked framing** - Messages are carried as length-prefixed chunks
//!   terminated by a zero-length chunk
//! - **Messages** - Typed request/response messages (HELLO, RUN, PULL, ...)
//! - **Handshake** - Protocol version negotiation and capability lookup
//!
//! Most users should use the high-level [`crate::session`] module instead
//! of interacting with the protocol directly.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::{ChunkCodec, MessageCodec, MAX_CHUNK_SIZE};
pub use error::{BoltError, BoltResult, HandshakeError, ServerErrorKind};
pub use handshake::{BoltVersion, Capabilities, BOLT_MAGIC, HANDSHAKE_SIZE};
pub use message::{Request, Response};
pub use packstream::value::{Value, ValueMap};
pub use packstream::PackError;
