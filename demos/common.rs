//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;
use ws_echo_harness::HarnessConfig;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub binary: bool,
    pub port: Option<u16>,
    pub host: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// Unparseable `--port` values are reported and ignored.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let port = value_of(&args, "--port").and_then(|v| match v.parse() {
            Ok(port) => Some(port),
            Err(_) => {
                eprintln!("[WARN] Ignoring invalid --port value: {v}");
                None
            }
        });

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            binary: args.iter().any(|a| a == "--binary"),
            port,
            host: value_of(&args, "--host").map(str::to_owned),
        }
    }

    /// Builds a configuration from the defaults plus any overrides.
    pub fn config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::new();
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(ref host) = self.host {
            config = config.with_host(host.clone());
        }
        config
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "ws_echo_harness=debug"
    } else {
        "ws_echo_harness=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Returns the value following `flag`, if present.
fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
