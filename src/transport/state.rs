//! Connection lifecycle state.
//!
//! ```text
//! Connecting ──► Open ──► Closing ──► Closed
//!      │                                 ▲
//!      └─────────── (handshake failed) ──┘
//! ```
//!
//! The state is shared between the [`Session`](super::Session) handle and its
//! I/O task, so it lives in an atomic and every transition is a
//! compare-and-swap. `Closed` is terminal and is entered exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Opening handshake in progress.
    Connecting = 0,
    /// Handshake complete, data may flow.
    Open = 1,
    /// Close requested or received, waiting for the transport to confirm.
    Closing = 2,
    /// Connection terminated.
    Closed = 3,
}

impl ConnectionState {
    /// Returns the lowercase name of the state.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Atomic holder for a [`ConnectionState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    /// Creates a cell holding `state`.
    #[inline]
    pub(crate) const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Returns the current state.
    #[inline]
    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to`.
    ///
    /// Returns `false` (and changes nothing) if the current state is not `from`.
    #[inline]
    pub(crate) fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves `Open` to `Closing`.
    ///
    /// Only one caller ever wins; that caller is responsible for sending
    /// the close frame.
    #[inline]
    pub(crate) fn begin_closing(&self) -> bool {
        self.transition(ConnectionState::Open, ConnectionState::Closing)
    }

    /// Enters `Closed`.
    ///
    /// Returns the previous state the first time, `None` on every later call.
    #[inline]
    pub(crate) fn mark_closed(&self) -> Option<ConnectionState> {
        let previous =
            ConnectionState::from_u8(self.0.swap(ConnectionState::Closed as u8, Ordering::AcqRel));
        (previous != ConnectionState::Closed).then_some(previous)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_transition_requires_expected_state() {
        let cell = StateCell::new(ConnectionState::Connecting);
        assert!(!cell.transition(ConnectionState::Open, ConnectionState::Closing));
        assert_eq!(cell.get(), ConnectionState::Connecting);

        assert!(cell.transition(ConnectionState::Connecting, ConnectionState::Open));
        assert_eq!(cell.get(), ConnectionState::Open);
    }

    #[test]
    fn test_begin_closing_only_from_open() {
        let cell = StateCell::new(ConnectionState::Connecting);
        assert!(!cell.begin_closing());

        let cell = StateCell::new(ConnectionState::Open);
        assert!(cell.begin_closing());
        assert!(!cell.begin_closing());
        assert_eq!(cell.get(), ConnectionState::Closing);
    }

    #[test]
    fn test_mark_closed_once() {
        let cell = StateCell::new(ConnectionState::Closing);
        assert_eq!(cell.mark_closed(), Some(ConnectionState::Closing));
        assert_eq!(cell.mark_closed(), None);
        assert_eq!(cell.get(), ConnectionState::Closed);
    }

    #[test]
    fn test_concurrent_begin_closing_single_winner() {
        let cell = Arc::new(StateCell::new(ConnectionState::Open));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.begin_closing())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
