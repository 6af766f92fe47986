//! JSON envelope carried by harness messages.
//!
//! # Format
//!
//! ```json
//! {
//!   "text": "hello",
//!   "type": "message",
//!   "date": 1700000000000
//! }
//! ```
//!
//! Text frames carry the envelope as a JSON string. Binary frames carry the
//! UTF-8 bytes of the same JSON document.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::message::{MESSAGE_KIND, Message, Payload, now_millis};

// ============================================================================
// Envelope
// ============================================================================

/// Application payload submitted by the echo client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// User-entered text.
    pub text: String,

    /// Semantic kind, `"message"` for submitted text.
    #[serde(rename = "type")]
    pub kind: String,

    /// Creation time in milliseconds since the Unix epoch.
    pub date: u64,
}

impl Envelope {
    /// Creates a `"message"` envelope stamped with the current time.
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MESSAGE_KIND.to_string(),
            date: now_millis(),
        }
    }

    /// Parses an envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not a JSON envelope.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::malformed_frame(e.to_string()))
    }

    /// Parses an envelope from a binary frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the bytes are not a JSON envelope.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::malformed_frame(e.to_string()))
    }

    /// Parses an envelope from either payload variant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the payload is not a JSON envelope.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        match payload {
            Payload::Text(text) => Self::parse(text),
            Payload::Binary(bytes) => Self::parse_bytes(bytes),
        }
    }

    /// Serializes the envelope to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Builds the message that carries this envelope.
    ///
    /// The message timestamp is the envelope's `date`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn into_message(self, as_binary: bool) -> Result<Message> {
        let json = self.to_json()?;
        let payload = if as_binary {
            Payload::Binary(json.into_bytes())
        } else {
            Payload::Text(json)
        };
        Ok(Message::with_timestamp(payload, self.date))
    }
}

// ============================================================================
// Tests
// ============================================================================
