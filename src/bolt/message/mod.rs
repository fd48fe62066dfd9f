//! Bolt message types.
//!
//! Each message is a PackStream structure whose signature identifies the
//! message type. Clients send [`Request`]s and receive [`Response`]s;
//! the shapes of some requests depend on the negotiated protocol version
//! (see [`Request::encode`]).

pub mod request;
pub mod response;

pub use request::Request;
pub use response::{Response, Summary};

/// Message signatures.
pub mod tag {
    /// HELLO in Bolt 4+, INIT in Bolt 1. Same signature, different shape.
    pub const HELLO: u8 = 0x01;
    /// Acknowledge a FAILURE (Bolt 1 recovery).
    pub const ACK_FAILURE: u8 = 0x0E;
    /// Reset the connection to a clean state (Bolt 4+ recovery).
    pub const RESET: u8 = 0x0F;
    /// Run a query.
    pub const RUN: u8 = 0x10;
    /// Open an explicit transaction.
    pub const BEGIN: u8 = 0x11;
    /// Commit the open transaction.
    pub const COMMIT: u8 = 0x12;
    /// Roll back the open transaction.
    pub const ROLLBACK: u8 = 0x13;
    /// Request result rows. PULL_ALL in Bolt 1.
    pub const PULL: u8 = 0x3F;
    /// Request completed.
    pub const SUCCESS: u8 = 0x70;
    /// One result row.
    pub const RECORD: u8 = 0x71;
    /// Request skipped because an earlier one failed.
    pub const IGNORED: u8 = 0x7E;
    /// Request failed.
    pub const FAILURE: u8 = 0x7F;
}
