//! Session lifecycle events.
//!
//! Every state change of a [`Session`](super::Session) is pushed to its
//! [`EventHandler`]; callers never need to poll.
//!
//! | Event | Emitted when |
//! |-------|--------------|
//! | `Opened` | Handshake completed, state is `Open` |
//! | `Message` | A data frame arrived (also delivered on the message stream) |
//! | `Closed` | Transport confirmed closure, state is `Closed` (exactly once) |
//! | `Error` | Handshake or transport failure |

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::{Message, status_text};

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called on the session's I/O task for each event. Keep it short; long
/// work should be handed off to another task.
///
/// The handler runs under the session's handler lock: calling
/// `set_event_handler` or `clear_event_handler` on the same session from
/// inside it deadlocks.
pub type EventHandler = Box<dyn Fn(&SessionEvent) + Send + Sync>;

// ============================================================================
// SessionEvent
// ============================================================================

/// A lifecycle event emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connection is open.
    Opened {
        /// Negotiated sub-protocol, if any.
        subprotocol: Option<String>,
    },

    /// A data message was received.
    Message(Message),

    /// Connection is closed.
    Closed {
        /// Close status code (1005 if the peer sent none, 1006 if no close
        /// frame was exchanged).
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Handshake or transport failure.
    Error {
        /// Description of the failure.
        message: String,
    },
}

impl SessionEvent {
    /// Returns the event name, for logging.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::Message(_) => "message",
            Self::Closed { .. } => "closed",
            Self::Error { .. } => "error",
        }
    }

    /// Returns `true` for a `Closed` event.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns the close code's name for a `Closed` event.
    #[inline]
    #[must_use]
    pub fn close_status_text(&self) -> Option<&'static str> {
        match self {
            Self::Closed { code, .. } => Some(status_text(*code)),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(SessionEvent::Opened { subprotocol: None }.name(), "opened");
        assert_eq!(SessionEvent::Message(Message::text("x")).name(), "message");
        assert_eq!(
            SessionEvent::Error {
                message: "boom".into()
            }
            .name(),
            "error"
        );
    }

    #[test]
    fn test_closed_status_text() {
        let event = SessionEvent::Closed {
            code: 1007,
            reason: "Malformed frame: bad".into(),
        };
        assert!(event.is_closed());
        assert_eq!(event.close_status_text(), Some("Inconsistent Message Type"));
        assert_eq!(
            SessionEvent::Opened { subprotocol: None }.close_status_text(),
            None
        );
    }
}
