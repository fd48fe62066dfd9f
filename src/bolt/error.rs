//! Bolt protocol error types.

use std::io;

use thiserror::Error;

use super::packstream::PackError;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Classification of a server-reported FAILURE.
///
/// Derived from the second dot-delimited component of the error code
/// string, e.g. `Memgraph.ClientError.MemgraphError.MemgraphError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// The client did something wrong (bad query, bad parameters, ...).
    /// Retrying the same request will fail again.
    Client,
    /// A temporary server-side condition (lock contention, leader
    /// election, ...). Retrying may succeed.
    Transient,
    /// The database itself failed. Usually worth reporting.
    Database,
    /// The error code was missing or did not follow the
    /// `<Namespace>.<Category>.<Subcategory>.<Name>` shape.
    Unknown,
}

impl ServerErrorKind {
    /// Classify an error code string by its category component.
    pub fn classify(code: &str) -> Self {
        let mut parts = code.split('.');
        let namespace = parts.next();
        let category = parts.next();
        // A well-formed code has four components.
        if namespace.is_none() || parts.next().is_none() || parts.next().is_none() {
            return ServerErrorKind::Unknown;
        }
        match category {
            Some("ClientError") => ServerErrorKind::Client,
            Some("TransientError") => ServerErrorKind::Transient,
            Some("DatabaseError") => ServerErrorKind::Database,
            _ => ServerErrorKind::Unknown,
        }
    }
}

/// Bolt protocol errors.
#[derive(Error, Debug)]
pub enum BoltError {
    /// Underlying transport I/O error. Fatal for the session.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Version handshake failed.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// PackStream encode/decode error. Fatal when it occurs on a
    /// received message.
    #[error("PackStream error: {0}")]
    Pack(#[from] PackError),

    /// The server violated the protocol (unexpected message type where a
    /// specific one was required). Fatal for the session.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Authentication was rejected during connect.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The connection was closed or could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// An operation was called in a session state where it is not legal.
    /// The session state is unchanged.
    #[error("bad call: {0}")]
    BadCall(&'static str),

    /// The server reported a query failure. The session has already run
    /// the recovery handshake and is usable again.
    #[error("server error ({code}): {message}")]
    Server {
        /// Classification parsed from `code`.
        kind: ServerErrorKind,
        /// The raw dot-delimited error code.
        code: String,
        /// Human-readable message, verbatim from the server.
        message: String,
    },

    /// An incoming message exceeded the configured size limit.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Observed (partial) message size.
        size: usize,
        /// Configured limit.
        max: usize,
    },
}

impl BoltError {
    /// Build a [`BoltError::Server`] from a FAILURE's code and message.
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        BoltError::Server {
            kind: ServerErrorKind::classify(&code),
            code,
            message: message.into(),
        }
    }

    /// Whether this error leaves the session unusable.
    ///
    /// Non-fatal errors are caller mistakes ([`BoltError::BadCall`]) and
    /// classified server failures, for which the recovery handshake has
    /// already restored the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BoltError::BadCall(_) | BoltError::Server { .. })
    }
}

/// Handshake-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The server echoed the all-zero version word.
    #[error("server does not support any proposed protocol version")]
    NoCompatibleVersion,

    /// The server echoed a version we never proposed.
    #[error("server selected unsupported version word 0x{0:08X}")]
    UnsupportedVersion(u32),

    /// The connection was closed mid-handshake.
    #[error("connection closed during handshake")]
    ConnectionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_categories() {
        assert_eq!(
            ServerErrorKind::classify("Memgraph.ClientError.MemgraphError.MemgraphError"),
            ServerErrorKind::Client
        );
        assert_eq!(
            ServerErrorKind::classify("Memgraph.TransientError.MemgraphError.MemgraphError"),
            ServerErrorKind::Transient
        );
        assert_eq!(
            ServerErrorKind::classify("Memgraph.DatabaseError.MemgraphError.MemgraphError"),
            ServerErrorKind::Database
        );
    }

    #[test]
    fn test_classify_neo_namespace() {
        // The namespace component is not inspected, only the category.
        assert_eq!(
            ServerErrorKind::classify("Neo.ClientError.Statement.SyntaxError"),
            ServerErrorKind::Client
        );
    }

    #[test]
    fn test_classify_malformed() {
        assert_eq!(ServerErrorKind::classify(""), ServerErrorKind::Unknown);
        assert_eq!(ServerErrorKind::classify("NotDotted"), ServerErrorKind::Unknown);
        assert_eq!(
            ServerErrorKind::classify("Memgraph.ClientError"),
            ServerErrorKind::Unknown
        );
        assert_eq!(
            ServerErrorKind::classify("Memgraph.ClientError.OnlyThree"),
            ServerErrorKind::Unknown
        );
        assert_eq!(
            ServerErrorKind::classify("Memgraph.WeirdCategory.Sub.Name"),
            ServerErrorKind::Unknown
        );
    }

    #[test]
    fn test_server_error_construction() {
        let err = BoltError::server(
            "Memgraph.TransientError.MemgraphError.MemgraphError",
            "deadlock detected",
        );
        match err {
            BoltError::Server { kind, ref message, .. } => {
                assert_eq!(kind, ServerErrorKind::Transient);
                assert_eq!(message, "deadlock detected");
            }
            _ => panic!("expected Server variant"),
        }
    }

    #[test]
    fn test_fatality() {
        assert!(!BoltError::BadCall("fetch before pull").is_fatal());
        assert!(!BoltError::server("Memgraph.ClientError.A.B", "x").is_fatal());
        assert!(BoltError::Protocol("unexpected RECORD".into()).is_fatal());
        assert!(BoltError::Connection("closed by peer".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let err = BoltError::server("Memgraph.ClientError.A.B", "boom");
        assert!(err.to_string().contains("Memgraph.ClientError.A.B"));
        assert!(err.to_string().contains("boom"));
    }
}
