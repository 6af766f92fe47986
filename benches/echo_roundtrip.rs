//! Echo round-trip benchmark suite.
//!
//! Measures submit-to-reply latency against a local echo server:
//! - Payload sizes: 16, 1024, 16384 bytes of text
//! - Frame types: text, binary
//!
//! Run with: cargo bench --bench echo_roundtrip
//! Results saved to: target/criterion/

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use ws_echo_harness::{EchoClient, EchoServer, EchoServerHandle, HarnessConfig};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[16, 1024, 16 * 1024];

// ============================================================================
// Setup
// ============================================================================

async fn setup() -> (EchoServerHandle, EchoClient) {
    let server = EchoServer::bind(&HarnessConfig::new().with_port(0))
        .await
        .expect("bind echo server")
        .spawn();

    let config = HarnessConfig::new()
        .with_port(server.port())
        .with_reply_timeout(Duration::from_secs(5));
    let client = EchoClient::connect(&config)
        .await
        .expect("connect echo client");

    (server, client)
}

// ============================================================================
// Benchmark: Round Trip
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (server, client) = rt.block_on(setup());

    let mut group = c.benchmark_group("echo_round_trip");
    group.measurement_time(Duration::from_secs(10));

    for &size in PAYLOAD_SIZES {
        let text = "x".repeat(size);

        for (label, as_binary) in [("text", false), ("binary", true)] {
            group.bench_with_input(BenchmarkId::new(label, size), &text, |b, text| {
                b.to_async(&rt).iter(|| async {
                    client.submit(text.as_str(), as_binary).expect("submit");
                    client.wait_for_reply().await.expect("reply")
                });
            });
        }
    }

    group.finish();

    rt.block_on(async {
        client.close().await;
        server.shutdown().await;
    });
}

criterion_group!(benches, bench_round_trip);
criterion_main!(benches);
