//! WebSocket session and its I/O task.
//!
//! A [`Session`] wraps exactly one WebSocket connection, client or server
//! side. The session spawns a tokio task that owns the socket and handles:
//!
//! - Inbound data frames (pushed to the [`MessageStream`] in receipt order)
//! - Outbound messages queued by [`Session::send`]
//! - The close handshake, in either direction
//! - Lifecycle events for the [`EventHandler`]
//!
//! # Example
//!
//! ```ignore
//! use ws_echo_harness::{Message, Session};
//!
//! let session = Session::connect("ws://127.0.0.1:5001", Some("json")).await?;
//! let mut messages = session.messages()?;
//!
//! session.send(Message::text(r#"{"text":"hi","type":"message","date":0}"#))?;
//! let echoed = messages.next_message().await;
//!
//! session.close("done");
//! session.wait_closed().await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::status::{ABNORMAL_CLOSURE, NO_STATUS_CODE, NORMAL_CLOSURE};
use crate::protocol::{Message, status_text};

use super::event::{EventHandler, SessionEvent};
use super::state::{ConnectionState, StateCell};
use super::stream::MessageStream;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time to wait for the peer to answer a close frame.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close reasons must fit a 125-byte control frame after the 2-byte code.
const MAX_CLOSE_REASON_BYTES: usize = 123;

// ============================================================================
// Types
// ============================================================================

/// Commands for the I/O task.
enum SessionCommand {
    /// Write a data frame.
    Send(Message),
    /// Start the close handshake.
    Close { code: u16, reason: String },
}

/// State shared between the session handle and its I/O task.
struct Shared {
    /// Connection identifier for logging.
    id: ConnectionId,
    /// Lifecycle state.
    state: StateCell,
    /// Negotiated sub-protocol, set once the handshake completes.
    subprotocol: OnceLock<Option<String>>,
    /// Event callback.
    event_handler: Mutex<Option<EventHandler>>,
}

impl Shared {
    fn new(state: ConnectionState, event_handler: Option<EventHandler>) -> Self {
        Self {
            id: ConnectionId::generate(),
            state: StateCell::new(state),
            subprotocol: OnceLock::new(),
            event_handler: Mutex::new(event_handler),
        }
    }

    fn emit(&self, event: SessionEvent) {
        trace!(connection_id = %self.id, event = event.name(), "Session event");
        let handler = self.event_handler.lock();
        if let Some(ref handler) = *handler {
            handler(&event);
        }
    }
}

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for a client-side [`Session`].
///
/// Use [`Session::builder()`] to create one.
pub struct SessionBuilder {
    /// `ws://` or `wss://` URL to connect to.
    endpoint: String,
    /// Sub-protocol requested in the handshake.
    subprotocol: Option<String>,
    /// Opening handshake timeout.
    connect_timeout: Duration,
    /// Close handshake timeout.
    close_timeout: Duration,
    /// Handler registered before the handshake starts.
    event_handler: Option<EventHandler>,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("endpoint", &self.endpoint)
            .field("subprotocol", &self.subprotocol)
            .field("connect_timeout", &self.connect_timeout)
            .field("close_timeout", &self.close_timeout)
            .field("event_handler", &self.event_handler.is_some())
            .finish()
    }
}

impl SessionBuilder {
    fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            subprotocol: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            event_handler: None,
        }
    }

    /// Requests a sub-protocol during the handshake.
    #[inline]
    #[must_use]
    pub fn subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = Some(protocol.into());
        self
    }

    /// Sets the opening handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Sets how long to wait for the peer to answer a close frame.
    #[inline]
    #[must_use]
    pub fn close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Registers the event handler.
    ///
    /// Registering here, rather than with [`Session::set_event_handler`],
    /// guarantees the handler sees the `Opened` event.
    #[inline]
    #[must_use]
    pub fn on_event(mut self, handler: impl Fn(&SessionEvent) + Send + Sync + 'static) -> Self {
        self.event_handler = Some(Box::new(handler));
        self
    }

    /// Starts the handshake and returns immediately.
    ///
    /// The returned session is `Connecting`; await [`Session::wait_open`]
    /// to learn the outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint is not a URL
    /// - [`Error::Connection`] if the scheme is not `ws` or `wss`
    /// - [`Error::Config`] if the sub-protocol is not a valid header value
    pub fn start(self) -> Result<Session> {
        let url = Url::parse(&self.endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::connection(format!(
                "Unsupported scheme '{}' in {}",
                url.scheme(),
                self.endpoint
            )));
        }

        let mut request = url.as_str().into_client_request()?;
        if let Some(ref protocol) = self.subprotocol {
            let value = HeaderValue::from_str(protocol)
                .map_err(|e| Error::config(format!("Invalid sub-protocol '{protocol}': {e}")))?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let shared = Arc::new(Shared::new(ConnectionState::Connecting, self.event_handler));
        let (session, task, opened_tx) = Session::assemble(
            Arc::clone(&shared),
            self.endpoint.clone(),
            self.close_timeout,
        );

        debug!(
            connection_id = %shared.id,
            endpoint = %self.endpoint,
            subprotocol = ?self.subprotocol,
            "Connecting"
        );

        let connect_timeout = self.connect_timeout;
        tokio::spawn(async move {
            let outcome = timeout(connect_timeout, connect_async(request)).await;

            let (ws_stream, response) = match outcome {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    task.fail_handshake(
                        Error::connection(format!("WebSocket handshake failed: {e}")),
                        opened_tx,
                    );
                    return;
                }
                Err(_) => {
                    task.fail_handshake(
                        Error::connection_timeout(millis(connect_timeout)),
                        opened_tx,
                    );
                    return;
                }
            };

            let negotiated = response
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let _ = task.shared.subprotocol.set(negotiated.clone());

            if task
                .shared
                .state
                .transition(ConnectionState::Connecting, ConnectionState::Open)
            {
                info!(
                    connection_id = %task.shared.id,
                    subprotocol = ?negotiated,
                    "WebSocket connection established"
                );
                task.shared.emit(SessionEvent::Opened {
                    subprotocol: negotiated,
                });
                let _ = opened_tx.send(Ok(()));
            } else {
                // close() was called while the handshake was in flight; the
                // queued Close command is handled by the event loop.
                let _ = opened_tx.send(Err(Error::connection(
                    "Session closed before the handshake completed",
                )));
            }

            task.run(ws_stream).await;
        });

        Ok(session)
    }

    /// Connects and waits for the handshake to complete.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the endpoint is unreachable or the handshake
    ///   is rejected
    /// - [`Error::ConnectionTimeout`] if the handshake does not complete in time
    pub async fn connect(self) -> Result<Session> {
        let session = self.start()?;
        session.wait_open().await?;
        Ok(session)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One WebSocket connection.
///
/// Owned by whoever created it: the client harness, or the server's
/// per-connection handler. Every operation takes the session explicitly;
/// there is no process-wide "current connection".
///
/// Dropping the session closes the connection gracefully.
pub struct Session {
    /// State shared with the I/O task.
    shared: Arc<Shared>,
    /// Endpoint URL (client) or peer address (server).
    endpoint: String,
    /// Channel to the I/O task.
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    /// Inbound stream, until taken.
    messages: Mutex<Option<MessageStream>>,
    /// Handshake outcome, until awaited.
    opened: Mutex<Option<oneshot::Receiver<Result<()>>>>,
    /// Flips to `true` once the session is closed.
    closed: watch::Receiver<bool>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.shared.id)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .field("subprotocol", &self.subprotocol())
            .finish()
    }
}

// ============================================================================
// Session - Constructors
// ============================================================================

impl Session {
    /// Creates a builder for a client session.
    #[inline]
    #[must_use]
    pub fn builder(endpoint: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(endpoint)
    }

    /// Connects to `endpoint`, optionally requesting `subprotocol`.
    ///
    /// # Errors
    ///
    /// See [`SessionBuilder::connect`].
    pub async fn connect(endpoint: &str, subprotocol: Option<&str>) -> Result<Self> {
        let mut builder = Self::builder(endpoint);
        if let Some(protocol) = subprotocol {
            builder = builder.subprotocol(protocol);
        }
        builder.connect().await
    }

    /// Wraps an accepted server-side WebSocket stream.
    ///
    /// The session starts `Open`; `Opened` is emitted to `event_handler`
    /// before this returns.
    pub(crate) fn from_server_stream<S>(
        ws_stream: WebSocketStream<S>,
        peer: String,
        subprotocol: Option<String>,
        event_handler: Option<EventHandler>,
        close_timeout: Duration,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(Shared::new(ConnectionState::Open, event_handler));
        let _ = shared.subprotocol.set(subprotocol.clone());

        let (session, task, opened_tx) = Self::assemble(shared, peer, close_timeout);
        // The upgrade already completed.
        let _ = opened_tx.send(Ok(()));

        info!(
            connection_id = %session.shared.id,
            peer = %session.endpoint,
            subprotocol = ?subprotocol,
            "WebSocket connection accepted"
        );
        session.shared.emit(SessionEvent::Opened { subprotocol });

        tokio::spawn(task.run(ws_stream));

        session
    }

    /// Wires a session handle to its (not yet started) I/O task.
    fn assemble(
        shared: Arc<Shared>,
        endpoint: String,
        close_timeout: Duration,
    ) -> (Self, SessionTask, oneshot::Sender<Result<()>>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (opened_tx, opened_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        let session = Self {
            shared: Arc::clone(&shared),
            endpoint,
            command_tx,
            messages: Mutex::new(Some(MessageStream::new(message_rx))),
            opened: Mutex::new(Some(opened_rx)),
            closed: closed_rx,
        };

        let task = SessionTask {
            shared,
            command_rx,
            message_tx,
            closed_tx,
            close_timeout,
        };

        (session, task, opened_tx)
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Returns the endpoint URL (client) or peer address (server).
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Returns `true` while the session is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns the negotiated sub-protocol.
    ///
    /// `None` until the handshake completes, or if none was negotiated.
    #[inline]
    #[must_use]
    pub fn subprotocol(&self) -> Option<&str> {
        self.shared.subprotocol.get().and_then(|p| p.as_deref())
    }

    /// Waits for the opening handshake to finish.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if the handshake failed
    /// - [`Error::InvalidState`] if the outcome was already consumed and the
    ///   session is no longer open
    pub async fn wait_open(&self) -> Result<()> {
        let opened = self.opened.lock().take();
        match opened {
            Some(rx) => rx.await.unwrap_or(Err(Error::ConnectionClosed)),
            None => match self.state() {
                ConnectionState::Open => Ok(()),
                state => Err(Error::invalid_state("wait for open", state)),
            },
        }
    }

    /// Queues a message for transmission.
    ///
    /// Text payloads are written as text frames, binary payloads as binary
    /// frames. Returns as soon as the message is queued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is `Open`.
    pub fn send(&self, message: Message) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(Error::invalid_state("send", state));
        }

        trace!(
            connection_id = %self.shared.id,
            payload = message.payload().variant_name(),
            len = message.payload().len(),
            "Queueing message"
        );

        self.command_tx
            .send(SessionCommand::Send(message))
            .map_err(|_| Error::invalid_state("send", ConnectionState::Closed))
    }

    /// Takes the inbound message stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamTaken`] on every call after the first.
    pub fn messages(&self) -> Result<MessageStream> {
        self.messages.lock().take().ok_or(Error::StreamTaken)
    }

    /// Closes the session with status 1000.
    ///
    /// Idempotent: only the first call has an effect.
    pub fn close(&self, reason: impl Into<String>) {
        self.close_with(NORMAL_CLOSURE, reason);
    }

    /// Closes the session with an explicit status code.
    ///
    /// Idempotent: only the first call has an effect. A session still
    /// connecting is closed as soon as its handshake finishes.
    pub fn close_with(&self, code: u16, reason: impl Into<String>) {
        let state = &self.shared.state;
        let won = state.begin_closing()
            || state.transition(ConnectionState::Connecting, ConnectionState::Closing);
        if !won {
            trace!(connection_id = %self.shared.id, "Close already requested");
            return;
        }

        let reason = truncate_reason(reason.into());
        debug!(connection_id = %self.shared.id, code, reason = %reason, "Close requested");
        let _ = self.command_tx.send(SessionCommand::Close { code, reason });
    }

    /// Waits until the session is `Closed`.
    pub async fn wait_closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Sets the event handler callback.
    ///
    /// Events already emitted are not replayed. Must not be called from
    /// inside this session's own handler.
    pub fn set_event_handler(&self, handler: EventHandler) {
        let mut guard = self.shared.event_handler.lock();
        *guard = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        let mut guard = self.shared.event_handler.lock();
        *guard = None;
    }
}

// ============================================================================
// SessionTask
// ============================================================================

/// The I/O side of a session.
struct SessionTask {
    shared: Arc<Shared>,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    message_tx: mpsc::UnboundedSender<Message>,
    closed_tx: watch::Sender<bool>,
    close_timeout: Duration,
}

impl SessionTask {
    /// Reports a failed opening handshake.
    fn fail_handshake(self, err: Error, opened_tx: oneshot::Sender<Result<()>>) {
        warn!(connection_id = %self.shared.id, error = %err, "WebSocket handshake failed");
        self.shared.emit(SessionEvent::Error {
            message: err.to_string(),
        });
        let _ = opened_tx.send(Err(err));
        self.finish(None);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run<S>(mut self, ws_stream: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = self.shared.id;
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut close_status: Option<(u16, String)> = None;

        // A close() issued during the handshake is already queued.
        loop {
            tokio::select! {
                // Incoming frames from the peer
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(Frame::Close(frame))) => {
                            let (code, reason) = close_parts(frame);
                            debug!(
                                connection_id = %id,
                                code,
                                status = status_text(code),
                                reason = %reason,
                                "Close frame received"
                            );
                            self.shared.state.begin_closing();
                            close_status = Some((code, reason));
                            // The close reply is flushed on the next read,
                            // which then ends the stream.
                        }

                        Some(Ok(frame)) => {
                            let Some(message) = Message::from_frame(frame) else {
                                continue;
                            };
                            if self.shared.state.get() != ConnectionState::Open {
                                trace!(connection_id = %id, "Dropping message received while closing");
                                continue;
                            }
                            trace!(
                                connection_id = %id,
                                payload = message.payload().variant_name(),
                                len = message.payload().len(),
                                "Message received"
                            );
                            self.shared.emit(SessionEvent::Message(message.clone()));
                            let _ = self.message_tx.send(message);
                        }

                        Some(Err(e)) => {
                            error!(connection_id = %id, error = %e, "WebSocket error");
                            self.shared.emit(SessionEvent::Error { message: e.to_string() });
                            break;
                        }

                        None => {
                            debug!(connection_id = %id, "WebSocket stream ended");
                            break;
                        }
                    }
                }

                // Commands from the session handle
                command = self.command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Send(message)) => {
                            if self.shared.state.get() != ConnectionState::Open {
                                debug!(connection_id = %id, "Dropping queued send, session is closing");
                                continue;
                            }
                            if let Err(e) = ws_write.send(message.into_frame()).await {
                                error!(connection_id = %id, error = %e, "Failed to send message");
                                self.shared.emit(SessionEvent::Error { message: e.to_string() });
                                break;
                            }
                        }

                        Some(SessionCommand::Close { code, reason }) => {
                            close_status = Some(
                                self.close_handshake(&mut ws_write, &mut ws_read, code, reason)
                                    .await,
                            );
                            break;
                        }

                        None => {
                            debug!(connection_id = %id, "Session dropped, closing");
                            self.shared.state.begin_closing();
                            // A peer close already in progress keeps its status.
                            if close_status.is_none() {
                                close_status = Some(
                                    self.close_handshake(
                                        &mut ws_write,
                                        &mut ws_read,
                                        NORMAL_CLOSURE,
                                        String::new(),
                                    )
                                    .await,
                                );
                            }
                            break;
                        }
                    }
                }
            }
        }

        self.finish(close_status);
    }

    /// Sends a close frame and waits for the peer's reply.
    ///
    /// Returns the code and reason the peer answered with, or ours if the
    /// peer never answered.
    async fn close_handshake<S>(
        &self,
        ws_write: &mut SplitSink<WebSocketStream<S>, Frame>,
        ws_read: &mut SplitStream<WebSocketStream<S>>,
        code: u16,
        reason: String,
    ) -> (u16, String)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = self.shared.id;
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.clone().into(),
        };

        if let Err(e) = ws_write.send(Frame::Close(Some(frame))).await {
            debug!(connection_id = %id, error = %e, "Failed to send close frame");
            return (code, reason);
        }

        let reply = timeout(self.close_timeout, async {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(Frame::Close(frame)) => return Some(close_parts(frame)),
                    Ok(_) => trace!(connection_id = %id, "Dropping frame received while closing"),
                    Err(e) => {
                        debug!(connection_id = %id, error = %e, "Error while closing");
                        return None;
                    }
                }
            }
            None
        })
        .await;

        match reply {
            Ok(Some(status)) => status,
            Ok(None) => (code, reason),
            Err(_) => {
                warn!(
                    connection_id = %id,
                    timeout_ms = millis(self.close_timeout),
                    "Peer did not answer close frame"
                );
                (code, reason)
            }
        }
    }

    /// Enters `Closed`, ends the message stream and emits `Closed` once.
    fn finish(mut self, close_status: Option<(u16, String)>) {
        let id = self.shared.id;

        // Ends the message stream.
        drop(self.message_tx);

        self.command_rx.close();
        let mut dropped = 0usize;
        while let Ok(command) = self.command_rx.try_recv() {
            if matches!(command, SessionCommand::Send(_)) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(connection_id = %id, dropped, "Dropped queued sends on close");
        }

        if let Some(previous) = self.shared.state.mark_closed() {
            let (code, reason) = close_status.unwrap_or((ABNORMAL_CLOSURE, String::new()));
            info!(
                connection_id = %id,
                code,
                status = status_text(code),
                from = %previous,
                "WebSocket connection closed"
            );
            self.shared.emit(SessionEvent::Closed { code, reason });
        }

        let _ = self.closed_tx.send(true);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Cuts a close reason to [`MAX_CLOSE_REASON_BYTES`] on a char boundary.
fn truncate_reason(mut reason: String) -> String {
    if reason.len() > MAX_CLOSE_REASON_BYTES {
        let mut end = MAX_CLOSE_REASON_BYTES;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Splits an optional close frame into code and reason.
fn close_parts(frame: Option<CloseFrame>) -> (u16, String) {
    match frame {
        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
        None => (NO_STATUS_CODE, String::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use tokio::net::TcpListener;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_CONNECT_TIMEOUT.as_secs(), 10);
        assert_eq!(DEFAULT_CLOSE_TIMEOUT.as_secs(), 5);
    }

    #[test]
    fn test_close_parts() {
        assert_eq!(close_parts(None), (NO_STATUS_CODE, String::new()));

        let frame = CloseFrame {
            code: CloseCode::Invalid,
            reason: "bad payload".to_string().into(),
        };
        assert_eq!(close_parts(Some(frame)), (1007, "bad payload".to_string()));
    }

    #[test]
    fn test_truncate_reason() {
        assert_eq!(truncate_reason("short".into()), "short");

        let long = "é".repeat(100);
        let cut = truncate_reason(long);
        assert!(cut.len() <= MAX_CLOSE_REASON_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = Session::builder("ws://127.0.0.1:5001");
        assert_eq!(builder.endpoint, "ws://127.0.0.1:5001");
        assert!(builder.subprotocol.is_none());
        assert_eq!(builder.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(builder.event_handler.is_none());
    }

    #[tokio::test]
    async fn test_start_rejects_http_scheme() {
        let err = Session::builder("http://127.0.0.1:5001").start().unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_start_rejects_garbage_url() {
        let err = Session::builder("not a url").start().unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Session::connect(&format!("ws://127.0.0.1:{port}"), None)
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_send_while_connecting_is_rejected() {
        let listener = TcpListener::bind((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let session = Session::builder(format!("ws://127.0.0.1:{port}"))
            .start()
            .unwrap();

        assert_eq!(session.state(), ConnectionState::Connecting);
        let err = session.send(Message::text("too early")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState {
                operation: "send",
                state: ConnectionState::Connecting
            }
        ));
    }

    #[tokio::test]
    async fn test_messages_taken_once() {
        let listener = TcpListener::bind((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let session = Session::builder(format!("ws://127.0.0.1:{port}"))
            .start()
            .unwrap();

        assert!(session.messages().is_ok());
        assert!(matches!(session.messages(), Err(Error::StreamTaken)));
    }

    #[tokio::test]
    async fn test_failed_handshake_closes_session() {
        let listener = TcpListener::bind((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let session = Session::builder(format!("ws://127.0.0.1:{port}"))
            .start()
            .unwrap();
        let mut messages = session.messages().unwrap();

        assert!(session.wait_open().await.is_err());
        session.wait_closed().await;

        assert_eq!(session.state(), ConnectionState::Closed);
        assert!(messages.next_message().await.is_none());
        assert!(session.send(Message::text("late")).unwrap_err().is_state_error());
    }
}
