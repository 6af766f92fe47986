//! WebSocket listener for server-side sessions.
//!
//! # Connection Flow
//!
//! 1. `Listener::bind` binds a TCP listener (port 0 picks a free port)
//! 2. `Listener::accept_tcp` waits for a TCP connection
//! 3. `Upgrader::upgrade` validates the HTTP upgrade and negotiates a
//!    sub-protocol
//! 4. The upgraded stream is wrapped in an `Open` [`Session`]

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::event::EventHandler;
use super::session::{DEFAULT_CLOSE_TIMEOUT, Session};

// ============================================================================
// Upgrader
// ============================================================================

/// Server-side WebSocket handshake settings.
///
/// Cheap to clone, so each accepted connection can be upgraded on its own
/// task without holding up the accept loop.
#[derive(Debug, Clone)]
pub struct Upgrader {
    /// Sub-protocols this server accepts, in preference order.
    subprotocols: Arc<[String]>,
    /// Close handshake timeout for accepted sessions.
    close_timeout: Duration,
}

impl Upgrader {
    /// Creates an upgrader accepting `subprotocols`.
    #[inline]
    #[must_use]
    pub fn new(subprotocols: Vec<String>) -> Self {
        Self {
            subprotocols: subprotocols.into(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Sets the close handshake timeout for accepted sessions.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Returns the accepted sub-protocols.
    #[inline]
    #[must_use]
    pub fn subprotocols(&self) -> &[String] {
        &self.subprotocols
    }

    /// Upgrades an accepted TCP stream to a WebSocket session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the WebSocket upgrade fails.
    pub async fn upgrade(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        event_handler: Option<EventHandler>,
    ) -> Result<Session> {
        let mut negotiated: Option<String> = None;

        let callback = |request: &Request, mut response: Response| {
            let offered = request
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|v| v.to_str().ok());

            if let Some(offered) = offered {
                match negotiate_subprotocol(offered, &self.subprotocols) {
                    Some(selected) => {
                        if let Ok(value) = HeaderValue::from_str(&selected) {
                            response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                            negotiated = Some(selected);
                        }
                    }
                    None => {
                        // Omitting the header makes a conforming client
                        // fail the handshake.
                        info!(%peer, offered, "No supported sub-protocol offered");
                    }
                }
            }

            Ok::<Response, ErrorResponse>(response)
        };

        let ws_stream = accept_hdr_async(stream, callback)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        Ok(Session::from_server_stream(
            ws_stream,
            peer.to_string(),
            negotiated,
            event_handler,
            self.close_timeout,
        ))
    }
}

// ============================================================================
// Listener
// ============================================================================

/// A bound WebSocket listener.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use ws_echo_harness::transport::{Listener, Upgrader};
///
/// let upgrader = Upgrader::new(vec!["json".into()]);
/// let listener = Listener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, upgrader).await?;
/// println!("listening on {}", listener.ws_url());
///
/// let session = listener.accept(None).await?;
/// ```
#[derive(Debug)]
pub struct Listener {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
    /// Handshake settings for accepted connections.
    upgrader: Upgrader,
}

impl Listener {
    /// Binds a listener to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Arguments
    ///
    /// * `ip` - IP address to bind to
    /// * `port` - Port to bind to (0 for random)
    /// * `upgrader` - Handshake settings for accepted connections
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16, upgrader: Upgrader) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(
            addr = %local_addr,
            subprotocols = ?upgrader.subprotocols(),
            "WebSocket listener bound"
        );

        Ok(Self {
            listener,
            local_addr,
            upgrader,
        })
    }

    /// Returns the port the listener is bound to.
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
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Returns the handshake settings.
    #[inline]
    #[must_use]
    pub fn upgrader(&self) -> &Upgrader {
        &self.upgrader
    }

    /// Waits for the next TCP connection without upgrading it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if accepting fails.
    pub async fn accept_tcp(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(%peer, "TCP connection accepted");
        Ok((stream, peer))
    }

    /// Accepts the next connection and upgrades it.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if accepting the TCP connection fails
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub async fn accept(&self, event_handler: Option<EventHandler>) -> Result<Session> {
        let (stream, peer) = self.accept_tcp().await?;
        self.upgrader.upgrade(stream, peer, event_handler).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Picks the first offered sub-protocol the server supports.
///
/// `offered` is the raw `Sec-WebSocket-Protocol` header value, a
/// comma-separated list in client preference order.
#[must_use]
pub fn negotiate_subprotocol(offered: &str, supported: &[String]) -> Option<String> {
    offered
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .find(|p| supported.iter().any(|s| s == p))
        .map(str::to_owned)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    fn json_only() -> Vec<String> {
        vec!["json".to_string()]
    }

    async fn localhost() -> Listener {
        Listener::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, Upgrader::new(json_only()))
            .await
            .expect("bind should succeed")
    }

    #[test]
    fn test_negotiate_single() {
        assert_eq!(
            negotiate_subprotocol("json", &json_only()),
            Some("json".to_string())
        );
    }

    #[test]
    fn test_negotiate_picks_first_supported_offer() {
        let supported = vec!["json".to_string(), "text".to_string()];
        assert_eq!(
            negotiate_subprotocol("xml, text, json", &supported),
            Some("text".to_string())
        );
    }

    #[test]
    fn test_negotiate_none_supported() {
        assert_eq!(negotiate_subprotocol("xml, soap", &json_only()), None);
        assert_eq!(negotiate_subprotocol("", &json_only()), None);
    }

    #[tokio::test]
    async fn test_bind_random_port() {
        let listener = localhost().await;

        assert!(listener.port() > 0);
        assert_eq!(
            listener.ws_url(),
            format!("ws://127.0.0.1:{}", listener.port())
        );
        assert_eq!(listener.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_bind_in_use_port_fails() {
        let first = localhost().await;

        let second = Listener::bind(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            first.port(),
            Upgrader::new(json_only()),
        )
        .await;
        assert!(matches!(second, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_accept_negotiates_subprotocol() {
        let listener = localhost().await;
        let url = listener.ws_url();

        let client = tokio::spawn(async move { Session::connect(&url, Some("json")).await });
        let server_side = listener.accept(None).await.expect("accept should succeed");
        let client_side = client.await.unwrap().expect("connect should succeed");

        assert_eq!(server_side.subprotocol(), Some("json"));
        assert_eq!(client_side.subprotocol(), Some("json"));
        assert!(server_side.is_open());
        assert!(server_side.wait_open().await.is_ok());
        assert!(client_side.wait_open().await.is_ok());

        client_side.close("done");
        client_side.wait_closed().await;
        server_side.wait_closed().await;
    }
}
