//! Inbound message stream.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

use crate::protocol::Message;

// ============================================================================
// MessageStream
// ============================================================================

/// Messages received on a session, in receipt order.
///
/// Unbounded and not restartable. Ends (yields `None`) once the session
/// is closed; it never yields an error.
#[derive(Debug)]
pub struct MessageStream {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl MessageStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Message>) -> Self {
        Self { rx }
    }

    /// Waits for the next message.
    ///
    /// Returns `None` once the session has closed and every message
    /// received before closure has been consumed.
    pub async fn next_message(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Stream for MessageStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::StreamExt;

    use crate::protocol::Payload;

    #[tokio::test]
    async fn test_preserves_order_and_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = MessageStream::new(rx);

        tx.send(Message::text("one")).unwrap();
        tx.send(Message::text("two")).unwrap();
        drop(tx);

        let first = stream.next().await.unwrap();
        let second = stream.next_message().await.unwrap();
        assert_eq!(first.payload().as_text(), Some("one"));
        assert_eq!(second.payload().as_text(), Some("two"));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_pending_until_message_arrives() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = tokio_test::task::spawn(MessageStream::new(rx));

        tokio_test::assert_pending!(stream.poll_next());

        tx.send(Message::binary(vec![1, 2, 3])).unwrap();
        assert!(stream.is_woken());

        let ready = tokio_test::assert_ready!(stream.poll_next());
        assert_eq!(ready.map(Message::into_payload), Some(Payload::Binary(vec![1, 2, 3])));
    }
}
