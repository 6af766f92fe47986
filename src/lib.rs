//! WebSocket echo harness - a minimal client and server for testing
//! WebSocket plumbing end to end.
//!
//! The client submits text wrapped in a small JSON envelope, the server
//! echoes every message back unmodified on the connection it arrived on,
//! and the client shows the most recent reply.
//!
//! # Architecture
//!
//! - **Transport Session**: one WebSocket connection, client or server side,
//!   driven by its own tokio task. Exposes `send`, a message stream, `close`
//!   and lifecycle events.
//! - **Echo Harness**: the two roles built on top of sessions.
//!   [`EchoServer`] runs one [`ConnectionHandler`] per accepted connection;
//!   [`EchoClient`] submits envelopes and tracks the latest reply.
//!
//! Key invariants:
//!
//! - A session moves `Connecting → Open → Closing → Closed`, never backwards
//! - `Closed` is reported exactly once per session
//! - Messages are delivered in receipt order
//! - Connections on the server share no state
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_echo_harness::{EchoClient, EchoServer, HarnessConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = EchoServer::bind(&HarnessConfig::new().with_port(0))
//!         .await?
//!         .spawn();
//!
//!     let client = EchoClient::connect(&HarnessConfig::new().with_port(server.port())).await?;
//!     client.submit("hello", false)?;
//!
//!     let reply = client.wait_for_reply().await?;
//!     println!("Echoed: {:?}", reply.as_text());
//!
//!     client.close().await;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`HarnessConfig`] shared by both roles |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`harness`] | [`EchoServer`] and [`EchoClient`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Messages, the JSON envelope and close status codes |
//! | [`transport`] | WebSocket sessions and the server listener |

// ============================================================================
// Modules
// ============================================================================

/// Harness configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Echo server and echo client.
pub mod harness;

/// Type-safe identifiers.
pub mod identifiers;

/// Message payloads and the JSON envelope.
pub mod protocol;

/// WebSocket transport layer.
///
/// Sessions, lifecycle events and the server-side listener.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::HarnessConfig;

// Error types
pub use error::{Error, Result};

// Harness roles
pub use harness::{ConnectionHandler, EchoClient, EchoHandler, EchoServer, EchoServerHandle};

// Identifier types
pub use identifiers::ConnectionId;

// Protocol types
pub use protocol::{Envelope, Message, Payload};

// Transport types
pub use transport::{ConnectionState, MessageStream, Session, SessionBuilder, SessionEvent};
