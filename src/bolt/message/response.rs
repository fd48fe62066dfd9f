//! Server-to-client messages.

use super::tag;
use crate::bolt::error::BoltError;
use crate::bolt::packstream::{Decoder, Value, ValueMap};

/// A message received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The request completed; carries summary metadata.
    Success(Summary),
    /// One result row.
    Record(Vec<Value>),
    /// The request failed. The server ignores further requests until the
    /// failure is acknowledged.
    Failure {
        /// Dot-delimited error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// The request was skipped because an earlier one failed.
    Ignored,
}

impl Response {
    /// The message name, as the protocol documentation spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Response::Success(_) => "SUCCESS",
            Response::Record(_) => "RECORD",
            Response::Failure { .. } => "FAILURE",
            Response::Ignored => "IGNORED",
        }
    }

    /// Parse a reassembled message body.
    pub fn parse(body: &[u8]) -> Result<Response, BoltError> {
        let mut dec = Decoder::new(body);
        let (signature, field_count) = dec.read_struct_header()?;
        let response = match signature {
            tag::SUCCESS => {
                let metadata = Self::single_map_field(&mut dec, field_count, "SUCCESS")?;
                Response::Success(Summary::new(metadata))
            }
            tag::RECORD => {
                if field_count != 1 {
                    return Err(BoltError::Protocol(format!(
                        "RECORD carries 1 field, got {}",
                        field_count
                    )));
                }
                match dec.decode_value()? {
                    Value::List(values) => Response::Record(values),
                    other => {
                        return Err(BoltError::Protocol(format!(
                            "RECORD field must be a list, got {}",
                            other.kind()
                        )))
                    }
                }
            }
            tag::FAILURE => {
                let metadata = Self::single_map_field(&mut dec, field_count, "FAILURE")?;
                let code = metadata
                    .get("code")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let message = metadata
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Response::Failure { code, message }
            }
            tag::IGNORED => {
                // Bolt 1 attaches a metadata map, later versions do not.
                for _ in 0..field_count {
                    dec.decode_value()?;
                }
                Response::Ignored
            }
            other => {
                return Err(BoltError::Protocol(format!(
                    "unexpected message signature 0x{:02X}",
                    other
                )))
            }
        };
        if !dec.is_exhausted() {
            return Err(BoltError::Protocol(format!(
                "{} trailing bytes after message",
                dec.remaining()
            )));
        }
        Ok(response)
    }

    fn single_map_field(
        dec: &mut Decoder<'_>,
        field_count: usize,
        name: &str,
    ) -> Result<ValueMap, BoltError> {
        if field_count != 1 {
            return Err(BoltError::Protocol(format!(
                "{} carries 1 field, got {}",
                name, field_count
            )));
        }
        match dec.decode_value()? {
            Value::Map(m) => Ok(m),
            other => Err(BoltError::Protocol(format!(
                "{} field must be a map, got {}",
                name,
                other.kind()
            ))),
        }
    }
}

/// SUCCESS metadata with typed accessors for the entries the session
/// layer cares about. The raw map stays available through
/// [`Summary::metadata`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    metadata: ValueMap,
}

impl Summary {
    /// Wrap a metadata map.
    pub fn new(metadata: ValueMap) -> Self {
        Self { metadata }
    }

    /// The full metadata map.
    pub fn metadata(&self) -> &ValueMap {
        &self.metadata
    }

    /// Column names from a RUN summary.
    pub fn fields(&self) -> Option<Vec<&str>> {
        let list = self.metadata.get("fields")?.as_list()?;
        list.iter().map(Value::as_str).collect()
    }

    /// Server-assigned query id from a RUN summary under an explicit
    /// transaction.
    pub fn qid(&self) -> Option<i64> {
        self.metadata.get("qid")?.as_int()
    }

    /// Whether more rows remain after a bounded PULL.
    pub fn has_more(&self) -> bool {
        self.metadata
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Bookmark from a COMMIT summary.
    pub fn bookmark(&self) -> Option<&str> {
        self.metadata.get("bookmark")?.as_str()
    }

    /// Server agent string from a HELLO summary.
    pub fn server_agent(&self) -> Option<&str> {
        self.metadata.get("server")?.as_str()
    }

    /// Connection id from a HELLO summary.
    pub fn connection_id(&self) -> Option<&str> {
        self.metadata.get("connection_id")?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::packstream::Encoder;

    fn success_body(build: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_struct_header(tag::SUCCESS, 1).unwrap();
        build(&mut enc);
        enc.as_bytes().to_vec()
    }

    #[test]
    fn test_parse_success_with_fields() {
        let body = success_body(|enc| {
            enc.write_map_header(2).unwrap();
            enc.write_string("fields").unwrap();
            enc.write_list_header(2).unwrap();
            enc.write_string("a").unwrap();
            enc.write_string("b").unwrap();
            enc.write_string("qid").unwrap();
            enc.write_int(4);
        });
        let response = Response::parse(&body).unwrap();
        let Response::Success(summary) = response else {
            panic!("expected SUCCESS");
        };
        assert_eq!(summary.fields(), Some(vec!["a", "b"]));
        assert_eq!(summary.qid(), Some(4));
        assert!(!summary.has_more());
    }

    #[test]
    fn test_parse_success_has_more() {
        let body = success_body(|enc| {
            enc.write_map_header(1).unwrap();
            enc.write_string("has_more").unwrap();
            enc.write_bool(true);
        });
        let Response::Success(summary) = Response::parse(&body).unwrap() else {
            panic!("expected SUCCESS");
        };
        assert!(summary.has_more());
    }

    #[test]
    fn test_parse_record() {
        let mut enc = Encoder::new();
        enc.write_struct_header(tag::RECORD, 1).unwrap();
        enc.write_list_header(2).unwrap();
        enc.write_int(1);
        enc.write_null();
        let response = Response::parse(enc.as_bytes()).unwrap();
        assert_eq!(
            response,
            Response::Record(vec![Value::Integer(1), Value::Null])
        );
    }

    #[test]
    fn test_parse_failure() {
        let mut enc = Encoder::new();
        enc.write_struct_header(tag::FAILURE, 1).unwrap();
        enc.write_map_header(2).unwrap();
        enc.write_string("code").unwrap();
        enc.write_string("Memgraph.ClientError.Statement.SyntaxError").unwrap();
        enc.write_string("message").unwrap();
        enc.write_string("bad query").unwrap();
        let response = Response::parse(enc.as_bytes()).unwrap();
        assert_eq!(
            response,
            Response::Failure {
                code: "Memgraph.ClientError.Statement.SyntaxError".into(),
                message: "bad query".into(),
            }
        );
    }

    #[test]
    fn test_parse_failure_missing_entries() {
        let mut enc = Encoder::new();
        enc.write_struct_header(tag::FAILURE, 1).unwrap();
        enc.write_map_header(0).unwrap();
        let response = Response::parse(enc.as_bytes()).unwrap();
        assert_eq!(
            response,
            Response::Failure {
                code: String::new(),
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_ignored_with_and_without_metadata() {
        let mut enc = Encoder::new();
        enc.write_struct_header(tag::IGNORED, 0).unwrap();
        assert_eq!(Response::parse(enc.as_bytes()).unwrap(), Response::Ignored);

        let mut enc = Encoder::new();
        enc.write_struct_header(tag::IGNORED, 1).unwrap();
        enc.write_map_header(0).unwrap();
        assert_eq!(Response::parse(enc.as_bytes()).unwrap(), Response::Ignored);
    }

    #[test]
    fn test_parse_unknown_signature() {
        let mut enc = Encoder::new();
        enc.write_struct_header(0x60, 0).unwrap();
        assert!(matches!(
            Response::parse(enc.as_bytes()),
            Err(BoltError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_rejects_trailing_bytes() {
        let mut body = success_body(|enc| {
            enc.write_map_header(0).unwrap();
        });
        body.push(0xC0);
        assert!(matches!(
            Response::parse(&body),
            Err(BoltError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_success_wrong_field_count() {
        let mut enc = Encoder::new();
        enc.write_struct_header(tag::SUCCESS, 2).unwrap();
        enc.write_map_header(0).unwrap();
        enc.write_map_header(0).unwrap();
        assert!(matches!(
            Response::parse(enc.as_bytes()),
            Err(BoltError::Protocol(_))
        ));
    }
}
