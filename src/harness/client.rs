//! Echo client.
//!
//! Submits user text as a JSON envelope and keeps the most recent payload
//! the server sent back.
//!
//! # Example
//!
//! ```ignore
//! use ws_echo_harness::{EchoClient, HarnessConfig};
//!
//! let client = EchoClient::connect(&HarnessConfig::new()).await?;
//!
//! client.submit("hello", false)?;
//! let reply = client.wait_for_reply().await?;
//! println!("{:?}", reply.as_text());
//!
//! client.close().await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::protocol::{Envelope, Message, Payload};
use crate::transport::session::millis;
use crate::transport::{ConnectionState, Session};

// ============================================================================
// EchoClient
// ============================================================================

/// Client role of the echo harness.
///
/// Owns one [`Session`]. A background task drains the session's message
/// stream and records each payload as the latest received.
#[derive(Debug)]
pub struct EchoClient {
    /// Underlying session.
    session: Session,
    /// Most recent payload from the server.
    latest: watch::Receiver<Option<Payload>>,
    /// Writer side, used by `submit` to clear the latest payload.
    latest_tx: Arc<watch::Sender<Option<Payload>>>,
    /// How long `wait_for_reply` waits.
    reply_timeout: Duration,
    /// Stream reader task.
    reader: JoinHandle<()>,
}

impl EchoClient {
    /// Connects to the server described by `config`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if the handshake fails
    pub async fn connect(config: &HarnessConfig) -> Result<Self> {
        config.validate_client()?;

        let mut builder = Session::builder(config.ws_url())
            .connect_timeout(config.connect_timeout)
            .close_timeout(config.close_timeout);
        if let Some(ref protocol) = config.subprotocol {
            builder = builder.subprotocol(protocol.clone());
        }

        let session = builder.connect().await?;
        let mut messages = session.messages()?;

        let (latest_tx, latest) = watch::channel(None);
        let latest_tx = Arc::new(latest_tx);
        let writer = Arc::clone(&latest_tx);
        let id = session.id();

        let reader = tokio::spawn(async move {
            while let Some(message) = messages.next_message().await {
                trace!(
                    connection_id = %id,
                    payload = message.payload().variant_name(),
                    len = message.payload().len(),
                    "Reply received"
                );
                writer.send_replace(Some(message.into_payload()));
            }
            debug!(connection_id = %id, "Reply stream ended");
        });

        info!(
            connection_id = %session.id(),
            endpoint = session.endpoint(),
            subprotocol = ?session.subprotocol(),
            "Echo client connected"
        );

        Ok(Self {
            session,
            latest,
            latest_tx,
            reply_timeout: config.reply_timeout,
            reader,
        })
    }

    /// Submits `text` wrapped in a `"message"` envelope.
    ///
    /// Sent as a text frame, or as a binary frame carrying the same JSON
    /// bytes when `as_binary` is set. Clears the latest received payload.
    /// Returns the message that was queued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is `Open`.
    pub fn submit(&self, text: impl Into<String>, as_binary: bool) -> Result<Message> {
        let state = self.session.state();
        if state != ConnectionState::Open {
            return Err(Error::invalid_state("submit", state));
        }

        let message = Envelope::new(text).into_message(as_binary)?;

        self.latest_tx.send_replace(None);
        self.session.send(message.clone())?;

        Ok(message)
    }

    /// Returns the most recent payload received, if any.
    #[must_use]
    pub fn latest_received(&self) -> Option<Payload> {
        self.latest.borrow().clone()
    }

    /// Waits for a payload to be received.
    ///
    /// Returns immediately if one arrived since the last `submit`.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if nothing arrives within the reply timeout
    /// - [`Error::ConnectionClosed`] if the session closes first
    pub async fn wait_for_reply(&self) -> Result<Payload> {
        let mut latest = self.latest.clone();
        let wait = async {
            tokio::select! {
                biased;

                reply = latest.wait_for(Option::is_some) => {
                    reply
                        .ok()
                        .and_then(|payload| payload.clone())
                        .ok_or(Error::ConnectionClosed)
                }

                () = self.session.wait_closed() => Err(Error::ConnectionClosed),
            }
        };

        timeout(self.reply_timeout, wait).await.map_err(|_| {
            Error::timeout("wait for echo reply", millis(self.reply_timeout))
        })?
    }

    /// Returns the underlying session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Closes the session with status 1000 and waits until it is closed.
    pub async fn close(&self) {
        self.session.close("client closed");
        self.wait_closed().await;
    }

    /// Waits until the session is closed by either side.
    pub async fn wait_closed(&self) {
        self.session.wait_closed().await;
    }
}

impl Drop for EchoClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::harness::EchoServer;

    async fn spawn_server() -> crate::harness::EchoServerHandle {
        EchoServer::bind(&HarnessConfig::new().with_port(0))
            .await
            .expect("bind should succeed")
            .spawn()
    }

    fn client_config(port: u16) -> HarnessConfig {
        HarnessConfig::new()
            .with_port(port)
            .with_reply_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_connect_rejects_port_zero() {
        let result = EchoClient::connect(&HarnessConfig::new().with_port(0)).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_submit_text_round_trip() {
        let server = spawn_server().await;
        let client = EchoClient::connect(&client_config(server.port())).await.unwrap();
        assert_eq!(client.session().subprotocol(), Some("json"));
        assert!(client.latest_received().is_none());

        let sent = client.submit("hello", false).unwrap();
        let reply = client.wait_for_reply().await.unwrap();

        assert_eq!(&reply, sent.payload());
        assert_eq!(client.latest_received(), Some(reply));

        client.close().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_binary_round_trip() {
        let server = spawn_server().await;
        let client = EchoClient::connect(&client_config(server.port())).await.unwrap();

        client.submit("bytes", true).unwrap();
        let reply = client.wait_for_reply().await.unwrap();

        assert!(reply.is_binary());
        let envelope = Envelope::from_payload(&reply).unwrap();
        assert_eq!(envelope.text, "bytes");
        assert_eq!(envelope.kind, "message");

        client.close().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let server = spawn_server().await;
        let client = EchoClient::connect(&client_config(server.port())).await.unwrap();

        client.close().await;

        let err = client.submit("late", false).unwrap_err();
        assert!(err.is_state_error());
        assert!(matches!(
            client.wait_for_reply().await,
            Err(Error::ConnectionClosed)
        ));

        server.shutdown().await;
    }
}
