//! Message and payload types.
//!
//! A [`Message`] is one unit of application data exchanged over a session.
//! Its [`Payload`] is either UTF-8 text or raw bytes, and the variant
//! decides the frame type on the wire:
//!
//! | Payload | Frame opcode |
//! |---------|--------------|
//! | [`Payload::Text`] | `0x1` text |
//! | [`Payload::Binary`] | `0x2` binary |

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use tokio_tungstenite::tungstenite::Message as Frame;

// ============================================================================
// Constants
// ============================================================================

/// Semantic kind carried by every harness message.
pub const MESSAGE_KIND: &str = "message";

// ============================================================================
// Payload
// ============================================================================

/// Message payload, text or binary, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text, sent as a text frame.
    Text(String),
    /// Raw bytes, sent as a binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns `true` for a text payload.
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Returns `true` for a binary payload.
    #[inline]
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Returns the text if this is a text payload.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the payload content as bytes regardless of variant.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label used in log fields.
    #[inline]
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A unit of data exchanged over a session.
///
/// Created by the sender immediately before transmission and read-only
/// afterwards: fields are only reachable through accessors, and
/// [`Session::send`](crate::transport::Session::send) takes the message
/// by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Text or binary content.
    payload: Payload,
    /// Creation time, milliseconds since the Unix epoch.
    timestamp: u64,
    /// Semantic kind.
    kind: &'static str,
}

impl Message {
    /// Creates a message stamped with the current time.
    #[inline]
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self::with_timestamp(payload, now_millis())
    }

    /// Creates a message with an explicit creation timestamp.
    #[inline]
    #[must_use]
    pub fn with_timestamp(payload: Payload, timestamp: u64) -> Self {
        Self {
            payload,
            timestamp,
            kind: MESSAGE_KIND,
        }
    }

    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Payload::Text(text.into()))
    }

    /// Creates a binary message.
    #[inline]
    #[must_use]
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Payload::Binary(bytes.into()))
    }

    /// Returns the payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the message and returns its payload.
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Returns the creation timestamp in milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the semantic kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Converts an inbound frame into a message.
    ///
    /// Returns `None` for control frames (ping, pong, close), which the
    /// transport handles itself.
    #[must_use]
    pub(crate) fn from_frame(frame: Frame) -> Option<Self> {
        match frame {
            Frame::Text(text) => Some(Self::new(Payload::Text(text.as_str().to_owned()))),
            Frame::Binary(bytes) => Some(Self::new(Payload::Binary(bytes.to_vec()))),
            _ => None,
        }
    }

    /// Converts the message into the outbound frame matching its payload.
    #[must_use]
    pub(crate) fn into_frame(self) -> Frame {
        match self.payload {
            Payload::Text(text) => Frame::Text(text.into()),
            Payload::Binary(bytes) => Frame::Binary(bytes.into()),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
