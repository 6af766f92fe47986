//! Echo server.
//!
//! Demonstrates:
//! - Binding an `EchoServer` from a `HarnessConfig`
//! - Running the accept loop in the background
//! - Graceful shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example echo_server
//!   cargo run --example echo_server -- --port 9001
//!   cargo run --example echo_server -- --host 0.0.0.0 --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use ws_echo_harness::{EchoServer, Result};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Echo Server ===\n");

    let config = args.config();
    let server = EchoServer::bind(&config).await?;

    println!("[1] Listening on {}", server.ws_url());
    println!(
        "    Sub-protocol: {}",
        config.subprotocol.as_deref().unwrap_or("(none)")
    );

    let handle = server.spawn();

    println!("\nPress Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    println!("\n[2] Shutting down...");
    handle.shutdown().await;
    println!("    ✓ Stopped");

    Ok(())
}
