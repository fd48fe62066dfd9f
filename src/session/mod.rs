//! The session state machine.
//!
//! A [`Session`] owns one Bolt connection and moves through four states:
//!
//! - **Ready**: no query in flight; `run` and transaction control are legal
//! - **Executing**: a query was accepted; `pull` is legal
//! - **Fetching**: rows are streaming; `fetch` is legal
//! - **Bad**: the connection is unusable
//!
//! Calling an operation in the wrong state returns
//! [`BoltError::BadCall`] and leaves the state unchanged. Server-reported
//! query failures run the recovery handshake (RESET, or ACK_FAILURE on
//! Bolt 1) before surfacing as [`BoltError::Server`], so the session is
//! ready again by the time the caller sees the error. Transport and
//! protocol errors put the session in the Bad state for good.

pub mod config;
pub mod result;

pub use config::ConnectParams;
pub use result::{PullOptions, Record};

use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};

use crate::bolt::codec::MessageCodec;
use crate::bolt::error::{BoltError, BoltResult, HandshakeError};
use crate::bolt::handshake::{
    build_handshake, parse_handshake_response, BoltVersion, Capabilities, HANDSHAKE_RESPONSE_SIZE,
};
use crate::bolt::message::{Request, Response, Summary};
use crate::bolt::packstream::ValueMap;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No query in flight.
    Ready,
    /// A query was accepted and awaits a pull.
    Executing,
    /// Rows are streaming.
    Fetching,
    /// The connection is unusable.
    Bad,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ready => "ready",
            Status::Executing => "executing",
            Status::Fetching => "fetching",
            Status::Bad => "bad",
        };
        f.write_str(s)
    }
}

/// A Bolt session over any async byte stream.
///
/// Production code uses [`Session::connect`] to get a session over TCP;
/// tests drive the state machine over an in-memory duplex stream via
/// [`Session::establish`].
pub struct Session<S = TcpStream> {
    stream: S,
    codec: MessageCodec,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    version: BoltVersion,
    status: Status,
    in_transaction: bool,
    // Open qids with their column names, oldest first. Populated only
    // inside an explicit transaction on versions that multiplex.
    open_queries: Vec<(i64, Arc<Vec<String>>)>,
    fetching_qid: Option<i64>,
    columns: Arc<Vec<String>>,
    summary: Option<Summary>,
    server_agent: Option<String>,
    connection_id: Option<String>,
    bookmark: Option<String>,
}

impl Session<TcpStream> {
    /// Connect over TCP, negotiate a protocol version, and authenticate.
    pub async fn connect(params: ConnectParams) -> BoltResult<Self> {
        let address = params.address();
        let connect = TcpStream::connect(&address);
        let stream = match params.connect_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, connect).await.map_err(|_| {
                BoltError::Connection(format!("timed out connecting to {}", address))
            })?,
            None => connect.await,
        }
        .map_err(|e| BoltError::Connection(format!("failed to connect to {}: {}", address, e)))?;
        stream.set_nodelay(true).ok();
        Self::establish(stream, params).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Negotiate a protocol version and authenticate over an
    /// already-connected stream.
    pub async fn establish(mut stream: S, params: ConnectParams) -> BoltResult<Self> {
        let version = Self::handshake(&mut stream).await?;
        tracing::debug!(version = %version, "negotiated protocol version");

        let mut session = Self {
            stream,
            codec: MessageCodec::new(version.capabilities()),
            read_buffer: BytesMut::with_capacity(8192),
            write_buffer: BytesMut::with_capacity(8192),
            version,
            status: Status::Ready,
            in_transaction: false,
            open_queries: Vec::new(),
            fetching_qid: None,
            columns: Arc::new(Vec::new()),
            summary: None,
            server_agent: None,
            connection_id: None,
            bookmark: None,
        };
        session.authenticate(&params).await?;
        Ok(session)
    }

    async fn handshake(stream: &mut S) -> BoltResult<BoltVersion> {
        stream.write_all(&build_handshake()).await?;
        stream.flush().await?;

        let mut response = [0u8; HANDSHAKE_RESPONSE_SIZE];
        stream.read_exact(&mut response).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                BoltError::Handshake(HandshakeError::ConnectionClosed)
            } else {
                BoltError::Io(e)
            }
        })?;
        Ok(parse_handshake_response(response)?)
    }

    async fn authenticate(&mut self, params: &ConnectParams) -> BoltResult<()> {
        let hello = Request::Hello {
            user_agent: params.user_agent().to_string(),
            auth: params.auth().clone(),
            routing: params.routing().cloned(),
        };
        self.send(hello).await?;
        match self.recv().await? {
            Response::Success(summary) => {
                self.server_agent = summary.server_agent().map(str::to_string);
                self.connection_id = summary.connection_id().map(str::to_string);
                Ok(())
            }
            Response::Failure { code, message } => {
                self.status = Status::Bad;
                Err(BoltError::Authentication(format!("{}: {}", code, message)))
            }
            other => {
                self.status = Status::Bad;
                Err(BoltError::Protocol(format!(
                    "unexpected {} in response to HELLO",
                    other.name()
                )))
            }
        }
    }

    /// Run a query. Legal in the Ready state; moves to Executing on
    /// success. Column names become available through
    /// [`Session::columns`].
    ///
    /// Inside an explicit transaction, on versions that multiplex
    /// queries, `run` is also legal from Executing: it starts an
    /// additional query that stays open alongside the earlier ones, each
    /// addressable by the query id from its RUN summary.
    pub async fn run(
        &mut self,
        query: &str,
        parameters: Option<ValueMap>,
        extra: Option<ValueMap>,
    ) -> BoltResult<()> {
        let additional_query = self.status == Status::Executing
            && self.in_transaction
            && self.capabilities().multiplexing;
        if self.status != Status::Ready && !additional_query {
            return Err(BoltError::BadCall("run requires a ready session"));
        }
        let request = Request::Run {
            query: query.to_string(),
            parameters: parameters.unwrap_or_default(),
            extra: extra.unwrap_or_default(),
        };
        self.send(request).await?;
        let summary = self.expect_success("RUN").await?;
        self.columns = Arc::new(
            summary
                .fields()
                .map(|fields| fields.into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        );
        if self.in_transaction && self.capabilities().multiplexing {
            if let Some(qid) = summary.qid() {
                self.open_queries.push((qid, self.columns.clone()));
            }
        }
        self.summary = Some(summary);
        self.status = Status::Executing;
        Ok(())
    }

    /// Request rows from the last executed query. Legal in the Executing
    /// state; moves to Fetching.
    ///
    /// On Bolt 1 every pull streams all rows; a row limit or query id
    /// cannot be expressed and `qid` is rejected.
    pub async fn pull(&mut self, options: PullOptions) -> BoltResult<()> {
        if self.status != Status::Executing {
            return Err(BoltError::BadCall("pull requires an executed query"));
        }
        let capabilities = self.capabilities();
        if options.qid.is_some() && !capabilities.multiplexing {
            return Err(BoltError::BadCall(
                "query ids require a protocol version with multiplexing",
            ));
        }
        if let Some(qid) = options.qid {
            let Some((_, columns)) = self.open_queries.iter().find(|(open, _)| *open == qid)
            else {
                return Err(BoltError::BadCall("no open query with that id"));
            };
            self.columns = Arc::clone(columns);
            self.fetching_qid = Some(qid);
        } else if let Some((qid, columns)) = self.open_queries.last() {
            // No qid addresses the most recently opened query.
            self.columns = Arc::clone(columns);
            self.fetching_qid = Some(*qid);
        } else {
            self.fetching_qid = None;
        }
        self.send(Request::Pull {
            n: options.n,
            qid: options.qid,
        })
        .await?;
        self.status = Status::Fetching;
        Ok(())
    }

    /// Fetch the next row. Legal in the Fetching state.
    ///
    /// Returns `Ok(Some(record))` for each row. At the end of the batch
    /// it returns `Ok(None)` and stores the batch summary; the session
    /// moves back to Executing when the summary says more rows remain
    /// (so another [`Session::pull`] is expected) or when other
    /// transaction queries are still open, otherwise to Ready.
    pub async fn fetch(&mut self) -> BoltResult<Option<Record>> {
        if self.status != Status::Fetching {
            return Err(BoltError::BadCall("fetch requires a pulled result stream"));
        }
        match self.recv().await? {
            Response::Record(values) => {
                if values.len() != self.columns.len() {
                    self.status = Status::Bad;
                    return Err(BoltError::Protocol(format!(
                        "record has {} values for {} columns",
                        values.len(),
                        self.columns.len()
                    )));
                }
                Ok(Some(Record::new(self.columns.clone(), values)))
            }
            Response::Success(summary) => {
                if summary.has_more() {
                    self.status = Status::Executing;
                } else {
                    if let Some(qid) = self.fetching_qid.take() {
                        self.open_queries.retain(|(open, _)| *open != qid);
                    }
                    self.status = if self.open_queries.is_empty() {
                        Status::Ready
                    } else {
                        Status::Executing
                    };
                }
                self.summary = Some(summary);
                Ok(None)
            }
            Response::Failure { code, message } => Err(self.recover(code, message).await),
            Response::Ignored => {
                self.status = Status::Bad;
                Err(BoltError::Protocol(
                    "unexpected IGNORED while fetching".into(),
                ))
            }
        }
    }

    /// Open an explicit transaction. Legal in the Ready state with no
    /// transaction open.
    ///
    /// Bolt 1 has no BEGIN message; there the transaction is opened by
    /// running the `BEGIN` query.
    pub async fn begin_transaction(&mut self) -> BoltResult<()> {
        if self.status != Status::Ready {
            return Err(BoltError::BadCall("begin requires a ready session"));
        }
        if self.in_transaction {
            return Err(BoltError::BadCall("a transaction is already open"));
        }
        if self.capabilities().multiplexing {
            self.send(Request::Begin {
                metadata: ValueMap::new(),
            })
            .await?;
            self.expect_success("BEGIN").await?;
        } else {
            self.run_to_completion("BEGIN").await?;
        }
        self.open_queries.clear();
        self.fetching_qid = None;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction. Legal in the Ready state with a
    /// transaction open. The commit bookmark, if the server returns one,
    /// is available through [`Session::last_bookmark`].
    pub async fn commit_transaction(&mut self) -> BoltResult<()> {
        self.check_transaction_call("commit requires a ready session")?;
        if self.capabilities().multiplexing {
            self.send(Request::Commit).await?;
            let result = self.expect_success("COMMIT").await;
            self.in_transaction = false;
            let summary = result?;
            self.bookmark = summary.bookmark().map(str::to_string);
            self.summary = Some(summary);
        } else {
            let result = self.run_to_completion("COMMIT").await;
            self.in_transaction = false;
            result?;
        }
        Ok(())
    }

    /// Roll back the open transaction. Legal in the Ready state with a
    /// transaction open.
    pub async fn rollback_transaction(&mut self) -> BoltResult<()> {
        self.check_transaction_call("rollback requires a ready session")?;
        if self.capabilities().multiplexing {
            self.send(Request::Rollback).await?;
            let result = self.expect_success("ROLLBACK").await;
            self.in_transaction = false;
            result?;
        } else {
            let result = self.run_to_completion("ROLLBACK").await;
            self.in_transaction = false;
            result?;
        }
        Ok(())
    }

    /// Discard all server-side state: any open result stream and any open
    /// transaction. Legal in every state except Bad; leaves the session
    /// Ready.
    pub async fn reset(&mut self) -> BoltResult<()> {
        if self.status == Status::Bad {
            return Err(BoltError::BadCall("cannot reset a bad session"));
        }
        self.send(Request::Reset).await?;
        loop {
            match self.recv().await? {
                Response::Success(_) => break,
                // Responses to requests queued before the reset.
                Response::Ignored | Response::Record(_) => continue,
                Response::Failure { .. } => {
                    self.status = Status::Bad;
                    return Err(BoltError::Protocol("RESET failed".into()));
                }
            }
        }
        self.status = Status::Ready;
        self.in_transaction = false;
        self.open_queries.clear();
        self.fetching_qid = None;
        Ok(())
    }

    /// The negotiated protocol version.
    pub fn version(&self) -> BoltVersion {
        self.version
    }

    /// What the negotiated version can do.
    pub fn capabilities(&self) -> Capabilities {
        self.codec.capabilities()
    }

    /// The current state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether an explicit transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Column names of the last executed query.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The most recent SUCCESS summary (from run, fetch or commit).
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// The server agent string reported during authentication.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// The connection id reported during authentication.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// The bookmark from the last committed transaction.
    pub fn last_bookmark(&self) -> Option<&str> {
        self.bookmark.as_deref()
    }

    fn check_transaction_call(&self, not_ready: &'static str) -> BoltResult<()> {
        if self.status != Status::Ready {
            return Err(BoltError::BadCall(not_ready));
        }
        if !self.in_transaction {
            return Err(BoltError::BadCall("no transaction is open"));
        }
        Ok(())
    }

    /// Run a query and drain its full result. Used for the statement-based
    /// transaction control on Bolt 1.
    async fn run_to_completion(&mut self, query: &str) -> BoltResult<()> {
        self.run(query, None, None).await?;
        self.pull(PullOptions::all()).await?;
        while self.fetch().await?.is_some() {}
        Ok(())
    }

    async fn expect_success(&mut self, what: &'static str) -> BoltResult<Summary> {
        match self.recv().await? {
            Response::Success(summary) => Ok(summary),
            Response::Failure { code, message } => Err(self.recover(code, message).await),
            other => {
                self.status = Status::Bad;
                Err(BoltError::Protocol(format!(
                    "unexpected {} in response to {}",
                    other.name(),
                    what
                )))
            }
        }
    }

    /// Acknowledge a server failure so the connection accepts requests
    /// again, then hand back the classified error. A failed recovery
    /// leaves the session Bad and returns the fatal error instead.
    ///
    /// RESET also aborts any open transaction and its queries
    /// server-side, so the transaction flag and the open-query
    /// bookkeeping are cleared either way.
    async fn recover(&mut self, code: String, message: String) -> BoltError {
        tracing::warn!(code = %code, "query failed, recovering connection");
        let server_error = BoltError::server(code, message);
        let request = if self.capabilities().reset_recovery {
            Request::Reset
        } else {
            Request::AckFailure
        };
        let outcome = self.run_recovery(request).await;
        match outcome {
            Ok(()) => {
                self.status = Status::Ready;
                self.in_transaction = false;
                self.open_queries.clear();
                self.fetching_qid = None;
                server_error
            }
            Err(fatal) => {
                self.status = Status::Bad;
                fatal
            }
        }
    }

    async fn run_recovery(&mut self, request: Request) -> BoltResult<()> {
        self.send(request).await?;
        loop {
            match self.recv().await? {
                Response::Success(_) => return Ok(()),
                // Requests queued behind the failure are ignored first.
                Response::Ignored => continue,
                other => {
                    return Err(BoltError::Protocol(format!(
                        "unexpected {} in response to recovery",
                        other.name()
                    )))
                }
            }
        }
    }

    async fn send(&mut self, request: Request) -> BoltResult<()> {
        self.write_buffer.clear();
        if let Err(e) = self.codec.encode(request, &mut self.write_buffer) {
            self.status = Status::Bad;
            return Err(e);
        }
        let write = async {
            self.stream.write_all(&self.write_buffer).await?;
            self.stream.flush().await
        };
        if let Err(e) = write.await {
            self.status = Status::Bad;
            return Err(e.into());
        }
        Ok(())
    }

    async fn recv(&mut self) -> BoltResult<Response> {
        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(response)) => return Ok(response),
                Ok(None) => {}
                Err(e) => {
                    self.status = Status::Bad;
                    return Err(e);
                }
            }
            match self.stream.read_buf(&mut self.read_buffer).await {
                Ok(0) => {
                    self.status = Status::Bad;
                    return Err(BoltError::Connection("connection closed by server".into()));
                }
                Ok(_) => {}
                Err(e) => {
                    self.status = Status::Bad;
                    return Err(e.into());
                }
            }
        }
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.version)
            .field("status", &self.status)
            .field("in_transaction", &self.in_transaction)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}
