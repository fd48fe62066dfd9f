//! Client-to-server messages.

use bytes::Bytes;

use super::tag;
use crate::bolt::handshake::Capabilities;
use crate::bolt::packstream::{Encoder, PackError, ValueMap};

/// A message sent by the client.
///
/// Construction is version-independent; [`Request::encode`] picks the
/// wire shape the negotiated version expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Open the session: identify the client and authenticate. Encoded as
    /// INIT (client name + auth map) on Bolt 1 and as HELLO (single extra
    /// map) on Bolt 4+.
    Hello {
        /// Client name and version, e.g. `mgbolt/0.1.0`.
        user_agent: String,
        /// Authentication entries (`scheme`, `principal`, `credentials`).
        auth: ValueMap,
        /// Routing context, sent only when the version supports it.
        routing: Option<ValueMap>,
    },
    /// Run a query. Bolt 1 sends two fields (query, parameters); Bolt 4+
    /// adds the extra metadata map.
    Run {
        /// The query text.
        query: String,
        /// Query parameters.
        parameters: ValueMap,
        /// Run metadata (bookmarks, timeout, ...). Dropped on Bolt 1.
        extra: ValueMap,
    },
    /// Request result rows. Bolt 1 sends PULL_ALL with no fields; Bolt 4+
    /// sends an extra map with `n` and optionally `qid`.
    Pull {
        /// Maximum rows to stream, or -1 for all.
        n: i64,
        /// Which open query to pull from. `None` means the latest.
        qid: Option<i64>,
    },
    /// Open an explicit transaction.
    Begin {
        /// Transaction metadata.
        metadata: ValueMap,
    },
    /// Commit the open transaction.
    Commit,
    /// Roll back the open transaction.
    Rollback,
    /// Discard all server-side state for this session.
    Reset,
    /// Acknowledge a FAILURE so the server resumes accepting requests.
    AckFailure,
}

impl Request {
    /// The message signature this request is sent under.
    pub fn tag(&self) -> u8 {
        match self {
            Request::Hello { .. } => tag::HELLO,
            Request::Run { .. } => tag::RUN,
            Request::Pull { .. } => tag::PULL,
            Request::Begin { .. } => tag::BEGIN,
            Request::Commit => tag::COMMIT,
            Request::Rollback => tag::ROLLBACK,
            Request::Reset => tag::RESET,
            Request::AckFailure => tag::ACK_FAILURE,
        }
    }

    /// The message name, as the protocol documentation spells it.
    pub fn name(&self, capabilities: Capabilities) -> &'static str {
        match self {
            Request::Hello { .. } if capabilities.init_style_auth => "INIT",
            Request::Hello { .. } => "HELLO",
            Request::Run { .. } => "RUN",
            Request::Pull { .. } if capabilities.pull_has_extra => "PULL",
            Request::Pull { .. } => "PULL_ALL",
            Request::Begin { .. } => "BEGIN",
            Request::Commit => "COMMIT",
            Request::Rollback => "ROLLBACK",
            Request::Reset => "RESET",
            Request::AckFailure => "ACK_FAILURE",
        }
    }

    /// Encode the message body for the given negotiated capabilities.
    pub fn encode(&self, capabilities: Capabilities) -> Result<Bytes, PackError> {
        let mut enc = Encoder::new();
        match self {
            Request::Hello {
                user_agent,
                auth,
                routing,
            } => {
                if capabilities.init_style_auth {
                    enc.write_struct_header(tag::HELLO, 2)?;
                    enc.write_string(user_agent)?;
                    enc.write_map(auth)?;
                } else {
                    enc.write_struct_header(tag::HELLO, 1)?;
                    let routing = routing.as_ref().filter(|_| capabilities.hello_routing);
                    let entries = 1 + auth.len() + routing.map_or(0, |_| 1);
                    enc.write_map_header(entries)?;
                    enc.write_string("user_agent")?;
                    enc.write_string(user_agent)?;
                    for (key, value) in auth.iter() {
                        enc.write_string(key)?;
                        enc.encode_value(value)?;
                    }
                    if let Some(routing) = routing {
                        enc.write_string("routing")?;
                        enc.write_map(routing)?;
                    }
                }
            }
            Request::Run {
                query,
                parameters,
                extra,
            } => {
                if capabilities.pull_has_extra {
                    enc.write_struct_header(tag::RUN, 3)?;
                    enc.write_string(query)?;
                    enc.write_map(parameters)?;
                    enc.write_map(extra)?;
                } else {
                    enc.write_struct_header(tag::RUN, 2)?;
                    enc.write_string(query)?;
                    enc.write_map(parameters)?;
                }
            }
            Request::Pull { n, qid } => {
                if capabilities.pull_has_extra {
                    enc.write_struct_header(tag::PULL, 1)?;
                    enc.write_map_header(1 + usize::from(qid.is_some()))?;
                    enc.write_string("n")?;
                    enc.write_int(*n);
                    if let Some(qid) = qid {
                        enc.write_string("qid")?;
                        enc.write_int(*qid);
                    }
                } else {
                    enc.write_struct_header(tag::PULL, 0)?;
                }
            }
            Request::Begin { metadata } => {
                enc.write_struct_header(tag::BEGIN, 1)?;
                enc.write_map(metadata)?;
            }
            Request::Commit | Request::Rollback | Request::Reset | Request::AckFailure => {
                enc.write_struct_header(self.tag(), 0)?;
            }
        }
        Ok(enc.into_bytes().freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::handshake::BoltVersion;
    use crate::bolt::packstream::Value;

    fn v1() -> Capabilities {
        BoltVersion::V1.capabilities()
    }

    fn v4() -> Capabilities {
        BoltVersion::V4_0.capabilities()
    }

    fn v43() -> Capabilities {
        BoltVersion::V4_3.capabilities()
    }

    fn basic_auth() -> ValueMap {
        let mut auth = ValueMap::new();
        auth.insert("scheme", "basic").unwrap();
        auth.insert("principal", "user").unwrap();
        auth.insert("credentials", "pass").unwrap();
        auth
    }

    #[test]
    fn test_hello_v1_is_init_shaped() {
        let req = Request::Hello {
            user_agent: "ua".into(),
            auth: basic_auth(),
            routing: None,
        };
        let body = req.encode(v1()).unwrap();
        // Struct with two fields: string + map.
        assert_eq!(body[0], 0xB2);
        assert_eq!(body[1], tag::HELLO);
        assert_eq!(&body[2..5], b"\x82ua");
        assert_eq!(body[5], 0xA3);
        assert_eq!(req.name(v1()), "INIT");
    }

    #[test]
    fn test_hello_v4_is_single_map() {
        let req = Request::Hello {
            user_agent: "ua".into(),
            auth: basic_auth(),
            routing: None,
        };
        let body = req.encode(v4()).unwrap();
        assert_eq!(body[0], 0xB1);
        assert_eq!(body[1], tag::HELLO);
        // user_agent + 3 auth entries
        assert_eq!(body[2], 0xA4);
        assert_eq!(req.name(v4()), "HELLO");
    }

    #[test]
    fn test_hello_routing_only_when_supported() {
        let mut routing = ValueMap::new();
        routing.insert("address", "localhost:7687").unwrap();
        let req = Request::Hello {
            user_agent: "ua".into(),
            auth: ValueMap::new(),
            routing: Some(routing),
        };
        // 4.0 has no routing entry, 4.3 does.
        let body = req.encode(v4()).unwrap();
        assert_eq!(body[2], 0xA1);
        let body = req.encode(v43()).unwrap();
        assert_eq!(body[2], 0xA2);
    }

    #[test]
    fn test_run_field_count_by_version() {
        let req = Request::Run {
            query: "RETURN 1".into(),
            parameters: ValueMap::new(),
            extra: ValueMap::new(),
        };
        let body = req.encode(v1()).unwrap();
        assert_eq!(body[0], 0xB2);
        let body = req.encode(v4()).unwrap();
        assert_eq!(body[0], 0xB3);
        assert_eq!(body[1], tag::RUN);
    }

    #[test]
    fn test_run_parameters_encoded() {
        let mut params = ValueMap::new();
        params.insert("x", Value::Integer(7)).unwrap();
        let req = Request::Run {
            query: "RETURN $x".into(),
            parameters: params,
            extra: ValueMap::new(),
        };
        let body = req.encode(v4()).unwrap();
        // query string, then {"x": 7}, then empty extra
        let tail = &body[body.len() - 5..];
        assert_eq!(tail, &[0xA1, 0x81, b'x', 0x07, 0xA0]);
    }

    #[test]
    fn test_pull_v1_has_no_fields() {
        let req = Request::Pull { n: -1, qid: None };
        let body = req.encode(v1()).unwrap();
        assert_eq!(&body[..], &[0xB0, tag::PULL]);
        assert_eq!(req.name(v1()), "PULL_ALL");
    }

    #[test]
    fn test_pull_v4_extra_map() {
        let req = Request::Pull { n: 1000, qid: None };
        let body = req.encode(v4()).unwrap();
        assert_eq!(&body[..], &[0xB1, tag::PULL, 0xA1, 0x81, b'n', 0xC9, 0x03, 0xE8]);

        let req = Request::Pull { n: -1, qid: Some(3) };
        let body = req.encode(v4()).unwrap();
        assert_eq!(
            &body[..],
            &[0xB1, tag::PULL, 0xA2, 0x81, b'n', 0xFF, 0x83, b'q', b'i', b'd', 0x03]
        );
    }

    #[test]
    fn test_fieldless_requests() {
        for (req, expected_tag) in [
            (Request::Commit, tag::COMMIT),
            (Request::Rollback, tag::ROLLBACK),
            (Request::Reset, tag::RESET),
            (Request::AckFailure, tag::ACK_FAILURE),
        ] {
            let body = req.encode(v4()).unwrap();
            assert_eq!(&body[..], &[0xB0, expected_tag]);
        }
    }

    #[test]
    fn test_begin_metadata() {
        let req = Request::Begin {
            metadata: ValueMap::new(),
        };
        let body = req.encode(v4()).unwrap();
        assert_eq!(&body[..], &[0xB1, tag::BEGIN, 0xA0]);
    }
}
