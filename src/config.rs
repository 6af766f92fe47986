//! Harness configuration.
//!
//! One value configures both roles: the server binds to `host:port`, the
//! client connects to `ws://host:port`.
//!
//! # Example
//!
//! ```ignore
//! use ws_echo_harness::HarnessConfig;
//!
//! let config = HarnessConfig::new()
//!     .with_port(8080)
//!     .with_host("0.0.0.0");
//!
//! assert_eq!(config.ws_url(), "ws://0.0.0.0:8080");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};

// ============================================================================
// Constants
// ============================================================================

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Sub-protocol requested by the client and accepted by the server.
pub const JSON_SUBPROTOCOL: &str = "json";

/// Default time the client waits for an echo.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// HarnessConfig
// ============================================================================

/// Configuration shared by the echo server and echo client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Host the server binds to and the client connects to.
    pub host: String,

    /// TCP port the server binds to and the client connects to.
    pub port: u16,

    /// Sub-protocol to request (client) and accept (server).
    pub subprotocol: Option<String>,

    /// Opening handshake timeout.
    pub connect_timeout: Duration,

    /// Close handshake timeout.
    pub close_timeout: Duration,

    /// How long [`EchoClient::wait_for_reply`](crate::EchoClient::wait_for_reply) waits.
    pub reply_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl HarnessConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            subprotocol: Some(JSON_SUBPROTOCOL.to_string()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl HarnessConfig {
    /// Sets the TCP port (0 lets the OS pick one for the server).
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the sub-protocol.
    #[inline]
    #[must_use]
    pub fn with_subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = Some(protocol.into());
        self
    }

    /// Disables sub-protocol negotiation.
    #[inline]
    #[must_use]
    pub fn without_subprotocol(mut self) -> Self {
        self.subprotocol = None;
        self
    }

    /// Sets the opening handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the close handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Sets how long the client waits for an echo.
    #[inline]
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl HarnessConfig {
    /// Returns the URL the client connects to.
    ///
    /// Format: `ws://{host}:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("ws://[{ip}]:{}", self.port),
            _ => format!("ws://{}:{}", self.host, self.port),
        }
    }

    /// Returns the socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            Error::config(format!(
                "Host '{}' is not an IP address. Use e.g. .with_host(\"127.0.0.1\")",
                self.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Returns the sub-protocols the server accepts.
    #[must_use]
    pub fn server_subprotocols(&self) -> Vec<String> {
        self.subprotocol.iter().cloned().collect()
    }

    /// Validates the configuration for the client role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty, the port is 0, or the
    /// sub-protocol is empty.
    pub fn validate_client(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("Host is required"));
        }
        if self.port == 0 {
            return Err(Error::config("Port 0 is only valid for the server"));
        }
        self.validate_subprotocol()
    }

    /// Validates the configuration for the server role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is not an IP address or the
    /// sub-protocol is empty.
    pub fn validate_server(&self) -> Result<()> {
        self.bind_addr()?;
        self.validate_subprotocol()
    }

    fn validate_subprotocol(&self) -> Result<()> {
        match self.subprotocol {
            Some(ref protocol) if protocol.trim().is_empty() => {
                Err(Error::config("Sub-protocol must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
