//! Echo server.
//!
//! Accepts WebSocket connections and echoes every data message back on the
//! connection it arrived on, unmodified: same payload variant, same bytes.
//!
//! # Connection Flow
//!
//! 1. `EchoServer::bind` binds to `host:port` from [`HarnessConfig`]
//! 2. The accept loop hands each TCP connection to its own task
//! 3. The task upgrades to WebSocket and negotiates the sub-protocol
//! 4. The [`ConnectionHandler`] drives the session until it closes
//!
//! Connections share no state; a failure on one is logged and closes only
//! that connection.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{HarnessConfig, JSON_SUBPROTOCOL};
use crate::error::Result;
use crate::protocol::status::INCONSISTENT_MESSAGE_TYPE;
use crate::protocol::{Envelope, Payload};
use crate::transport::{Listener, Session, Upgrader};

// ============================================================================
// ConnectionHandler
// ============================================================================

/// Drives one accepted server-side session.
///
/// Called on the connection's own task. Returning an error logs it; the
/// session is closed when it is dropped either way.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles `session` until it closes.
    async fn handle(&self, session: Session) -> Result<()>;
}

// ============================================================================
// EchoHandler
// ============================================================================

/// Echoes every received message back to its sender.
///
/// On a `"json"` session every text frame must be a JSON envelope;
/// anything else closes the session with status 1007.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl ConnectionHandler for EchoHandler {
    async fn handle(&self, session: Session) -> Result<()> {
        let mut messages = session.messages()?;
        let validate = session.subprotocol() == Some(JSON_SUBPROTOCOL);
        let id = session.id();

        while let Some(message) = messages.next_message().await {
            if validate
                && let Payload::Text(text) = message.payload()
                && let Err(err) = Envelope::parse(text)
            {
                warn!(connection_id = %id, error = %err, "Closing connection on malformed frame");
                session.close_with(INCONSISTENT_MESSAGE_TYPE, err.to_string());
                session.wait_closed().await;
                return Err(err);
            }

            debug!(
                connection_id = %id,
                payload = message.payload().variant_name(),
                len = message.payload().len(),
                "Echoing message"
            );

            if let Err(e) = session.send(message) {
                // Peer started closing; the stream ends shortly.
                debug!(connection_id = %id, error = %e, "Echo dropped");
                break;
            }
        }

        session.wait_closed().await;
        Ok(())
    }
}

// ============================================================================
// EchoServer
// ============================================================================

/// A bound echo server.
///
/// # Example
///
/// ```ignore
/// use ws_echo_harness::{EchoServer, HarnessConfig};
///
/// let server = EchoServer::bind(&HarnessConfig::new().with_port(0)).await?;
/// println!("listening on {}", server.ws_url());
///
/// let handle = server.spawn();
/// // ... connect clients ...
/// handle.shutdown().await;
/// ```
pub struct EchoServer<H = EchoHandler> {
    /// Bound listener.
    listener: Listener,
    /// Per-connection handler.
    handler: Arc<H>,
}

impl EchoServer<EchoHandler> {
    /// Binds an echo server.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the configuration is invalid
    /// - [`Error::Io`](crate::Error::Io) if binding fails
    pub async fn bind(config: &HarnessConfig) -> Result<Self> {
        Self::bind_with_handler(config, EchoHandler).await
    }
}

impl<H: ConnectionHandler> EchoServer<H> {
    /// Binds a server that runs `handler` for each connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the configuration is invalid
    /// - [`Error::Io`](crate::Error::Io) if binding fails
    pub async fn bind_with_handler(config: &HarnessConfig, handler: H) -> Result<Self> {
        config.validate_server()?;
        let addr = config.bind_addr()?;

        let upgrader = Upgrader::new(config.server_subprotocols())
            .with_close_timeout(config.close_timeout);
        let listener = Listener::bind(addr.ip(), addr.port(), upgrader).await?;

        info!(addr = %listener.local_addr(), "Echo server bound");

        Ok(Self {
            listener,
            handler: Arc::new(handler),
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.listener.port()
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Returns the WebSocket URL clients should connect to.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.listener.ws_url()
    }

    /// Runs the accept loop on the current task, forever.
    pub async fn serve(self) {
        self.accept_loop(Arc::new(Notify::new())).await;
    }

    /// Runs the accept loop on a background task.
    #[must_use]
    pub fn spawn(self) -> EchoServerHandle {
        let local_addr = self.local_addr();
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(self.accept_loop(Arc::clone(&shutdown)));

        EchoServerHandle {
            local_addr,
            shutdown,
            task,
        }
    }

    /// Accepts connections until `shutdown` is notified.
    async fn accept_loop(self, shutdown: Arc<Notify>) {
        debug!("Accept loop started");

        loop {
            tokio::select! {
                () = shutdown.notified() => {
                    debug!("Accept loop shutting down");
                    break;
                }

                accepted = self.listener.accept_tcp() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let upgrader = self.listener.upgrader().clone();
                            let handler = Arc::clone(&self.handler);

                            tokio::spawn(async move {
                                let session = match upgrader.upgrade(stream, peer, None).await {
                                    Ok(session) => session,
                                    Err(e) => {
                                        warn!(error = %e, %peer, "WebSocket upgrade failed");
                                        return;
                                    }
                                };

                                if let Err(e) = handler.handle(session).await {
                                    warn!(error = %e, %peer, "Connection handling failed");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                        }
                    }
                }
            }
        }

        debug!("Accept loop terminated");
    }
}

// ============================================================================
// EchoServerHandle
// ============================================================================

/// Handle to an echo server running on a background task.
///
/// Dropping the handle leaves the server running.
#[derive(Debug)]
pub struct EchoServerHandle {
    /// Address the server is bound to.
    local_addr: SocketAddr,
    /// Stops the accept loop.
    shutdown: Arc<Notify>,
    /// Accept loop task.
    task: JoinHandle<()>,
}

impl EchoServerHandle {
    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL clients should connect to.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    ///
    /// Connections already accepted keep running until their peers close.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            error!(error = %e, "Accept loop panicked");
        }
        info!(addr = %self.local_addr, "Echo server stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    fn test_config() -> HarnessConfig {
        HarnessConfig::new().with_port(0)
    }

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = EchoServer::bind(&test_config()).await.unwrap();
        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}", server.port()));
    }

    #[tokio::test]
    async fn test_bind_rejects_hostname() {
        let config = test_config().with_host("localhost");
        let result = EchoServer::bind(&config).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let server = EchoServer::bind(&test_config()).await.unwrap();
        let port = server.port();

        let handle = server.spawn();
        assert_eq!(handle.port(), port);
        assert_eq!(handle.ws_url(), format!("ws://127.0.0.1:{port}"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_echoes_text() {
        let handle = EchoServer::bind(&test_config()).await.unwrap().spawn();

        let session = Session::connect(&handle.ws_url(), None).await.unwrap();
        let mut messages = session.messages().unwrap();

        session.send(crate::Message::text("plain text")).unwrap();
        let echoed = messages.next_message().await.unwrap();
        assert_eq!(echoed.payload(), &Payload::Text("plain text".into()));

        session.close("done");
        session.wait_closed().await;
        handle.shutdown().await;
    }
}
