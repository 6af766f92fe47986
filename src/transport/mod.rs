//! WebSocket transport layer.
//!
//! This module wraps one WebSocket connection per [`Session`], client or
//! server side, on top of `tokio-tungstenite`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  EchoClient     │                              │  EchoServer     │
//! │                 │         WebSocket            │                 │
//! │  Session        │◄────────────────────────────►│  Listener       │
//! │  (client side)  │      host:5001, "json"       │  → Session      │
//! │                 │                              │  (one per peer) │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Session::builder(url).start()` - handshake runs on a spawned task (`Connecting`)
//! 2. `Session::wait_open` - handshake done, `Opened` emitted (`Open`)
//! 3. `Session::send` / `Session::messages` - data flows
//! 4. `Session::close` - close handshake (`Closing`), then `Closed` emitted once
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Lifecycle events and handler type |
//! | `listener` | Server-side binding, upgrade and sub-protocol negotiation |
//! | `session` | Session handle and its I/O task |
//! | `state` | Lifecycle state machine |
//! | `stream` | Inbound message stream |

// ============================================================================
// Submodules
// ============================================================================

/// Lifecycle events.
pub mod event;

/// WebSocket listener for server-side sessions.
pub mod listener;

/// WebSocket session and its I/O task.
pub mod session;

/// Connection lifecycle state.
pub mod state;

/// Inbound message stream.
pub mod stream;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{EventHandler, SessionEvent};
pub use listener::{Listener, Upgrader, negotiate_subprotocol};
pub use session::{DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, Session, SessionBuilder};
pub use state::ConnectionState;
pub use stream::MessageStream;
