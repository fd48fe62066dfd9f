//! # mgbolt
//!
//! An async client for [Memgraph](https://memgraph.com) and other
//! Bolt-compatible graph database servers.
//!
//! The crate implements the Bolt wire protocol: version handshake,
//! PackStream value serialization, chunked message framing, and a
//! session state machine for query execution and explicit transactions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mgbolt::{ConnectParams, Session, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = ConnectParams::new("localhost", 7687)
//!         .with_basic_auth("memgraph", "password");
//!     let mut session = Session::connect(params).await?;
//!
//!     session.run("UNWIND [1, 2, 3] AS n RETURN n", None, None).await?;
//!     session.pull(Default::default()).await?;
//!     while let Some(record) = session.fetch().await? {
//!         println!("{:?}", record.values());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Explicit Transactions
//!
//! ```rust,no_run
//! # use mgbolt::{ConnectParams, Session, PullOptions};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut session = Session::connect(ConnectParams::new("localhost", 7687)).await?;
//! session.begin_transaction().await?;
//! session.run("CREATE (n:Node) RETURN n", None, None).await?;
//! session.pull(PullOptions::all()).await?;
//! while session.fetch().await?.is_some() {}
//! session.commit_transaction().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`bolt`] - Low-level protocol implementation (PackStream, framing,
//!   messages, handshake)
//! - [`session`] - The session state machine and connection handling

#![warn(missing_docs)]

pub mod bolt;
pub mod session;

pub use bolt::packstream::value::{
    Date, DateTime, DateTimeZoneId, Duration, LocalDateTime, LocalTime, Node, Path, Point2d,
    Point3d, Relationship, Time, UnboundRelationship,
};
pub use bolt::{BoltError, BoltResult, BoltVersion, PackError, ServerErrorKind, Value, ValueMap};
pub use session::{ConnectParams, PullOptions, Record, Session, Status};
