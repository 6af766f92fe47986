//! Application message types.
//!
//! This module defines what travels inside WebSocket data frames.
//!
//! # Protocol Overview
//!
//! | Type | Purpose |
//! |------|---------|
//! | `Message` | One unit of data: payload + timestamp + kind |
//! | `Payload` | Text (text frame) or bytes (binary frame) |
//! | `Envelope` | JSON object `{text, type, date}` submitted by the client |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | JSON envelope parsing and encoding |
//! | `message` | Message and payload types |
//! | `status` | Close status codes |

// ============================================================================
// Submodules
// ============================================================================

/// JSON envelope carried by harness messages.
pub mod envelope;

/// Message and payload types.
pub mod message;

/// Close status codes.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
pub use message::{MESSAGE_KIND, Message, Payload, now_millis};
pub use status::status_text;
