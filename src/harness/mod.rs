//! Echo harness roles.
//!
//! | Role | Type | Behavior |
//! |------|------|----------|
//! | Server | [`EchoServer`] | Echoes every message back on its own connection |
//! | Client | [`EchoClient`] | Submits JSON envelopes, keeps the latest reply |

// ============================================================================
// Submodules
// ============================================================================

/// Client role.
pub mod client;

/// Server role.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::EchoClient;
pub use server::{ConnectionHandler, EchoHandler, EchoServer, EchoServerHandle};
