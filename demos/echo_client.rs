//! Interactive echo client.
//!
//! Demonstrates:
//! - Connecting an `EchoClient` with the "json" sub-protocol
//! - Submitting envelopes as text or binary frames
//! - Waiting for and printing the echoed payload
//!
//! Each line read from stdin is submitted; an empty line or EOF closes the
//! connection.
//!
//! Usage:
//!   cargo run --example echo_client
//!   cargo run --example echo_client -- --port 9001
//!   cargo run --example echo_client -- --binary --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use ws_echo_harness::{EchoClient, Envelope, Payload, Result};

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
    println!("=== Echo Client ===\n");

    let config = args.config();
    println!("[1] Connecting to {}...", config.ws_url());

    let client = EchoClient::connect(&config).await?;
    println!(
        "    ✓ Connected (sub-protocol: {})\n",
        client.session().subprotocol().unwrap_or("none")
    );

    let mode = if args.binary { "binary" } else { "text" };
    println!("[2] Type a message and press Enter ({mode} frames, empty line quits)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            break;
        }

        client.submit(line, args.binary)?;
        let reply = client.wait_for_reply().await?;
        print_reply(&reply);
    }

    println!("\n[3] Closing...");
    client.close().await;
    println!("    ✓ Closed");

    Ok(())
}

fn print_reply(reply: &Payload) {
    match Envelope::from_payload(reply) {
        Ok(envelope) => println!(
            "    ← [{}] {} (date {})",
            reply.variant_name(),
            envelope.text,
            envelope.date
        ),
        Err(_) => println!("    ← [{}] {:?}", reply.variant_name(), reply),
    }
}
