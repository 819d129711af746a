//! Integration tests for the streaming client against a local TCP listener
//! standing in for the engine's ingestion socket.

use runsess_core::PriceTick;
use runsess_feed::{FeedConfig, FeedError, MarketDataClient};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn test_config(addr: String, snapshot: std::path::PathBuf) -> FeedConfig {
    FeedConfig {
        engine_addr: addr,
        synthetic_only: true,
        synthetic_seed: Some(11),
        buffer_capacity: 50,
        flush_interval: 3,
        pace: Duration::from_millis(10),
        penalty_delay: Duration::from_millis(10),
        retry_delay: Duration::from_millis(50),
        snapshot_path: snapshot,
        ..FeedConfig::default()
    }
}

/// Reserve a local port, then release it so the client can target it
/// before anything is listening.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_forwards_wire_lines_and_flushes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let dir = tempfile::TempDir::new().unwrap();
    let snapshot = dir.path().join("market_data.csv");

    let client = MarketDataClient::new(test_config(addr, snapshot.clone())).unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(client.run(cancel.clone()));

    let (stream, _) = listener.accept().await.unwrap();
    let mut lines = BufReader::new(stream).lines();

    let mut received = Vec::new();
    while received.len() < 7 {
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .expect("feeder stalled")
            .unwrap()
            .expect("feeder closed socket early");
        let tick: PriceTick = serde_json::from_str(&line).unwrap();
        assert_eq!(tick.symbol, "BTC");
        assert!(tick.price > 29000.0 && tick.price < 30000.0);
        received.push(tick);
    }

    cancel.cancel();
    let summary = handle.await.unwrap().unwrap();
    assert!(summary.ticks_sent >= 7);
    // flush_interval = 3, at least 7 ticks accepted -> at least 2 flushes.
    assert!(summary.flushes >= 2);

    let content = std::fs::read_to_string(&snapshot).unwrap();
    let mut line_iter = content.lines();
    assert_eq!(line_iter.next().unwrap(), "symbol,price,timestamp");
    assert!(line_iter.count() >= 3);
}

#[tokio::test]
async fn test_retries_until_engine_listens() {
    let port = free_port().await;
    let addr = format!("127.0.0.1:{port}");
    let dir = tempfile::TempDir::new().unwrap();

    let client =
        MarketDataClient::new(test_config(addr.clone(), dir.path().join("m.csv"))).unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(client.run(cancel.clone()));

    // Feeder starts before any listener exists. It must keep retrying
    // rather than exit or error.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!handle.is_finished());

    let listener = TcpListener::bind(&addr).await.unwrap();
    let (stream, _) = listener.accept().await.unwrap();
    let mut lines = BufReader::new(stream).lines();
    let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("feeder never connected")
        .unwrap()
        .expect("feeder closed socket");
    let tick: PriceTick = serde_json::from_str(&line).unwrap();
    assert_eq!(tick.symbol, "BTC");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancellation_before_connect_exits_cleanly() {
    let port = free_port().await;
    let dir = tempfile::TempDir::new().unwrap();

    let client = MarketDataClient::new(test_config(
        format!("127.0.0.1:{port}"),
        dir.path().join("m.csv"),
    ))
    .unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(client.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("feeder did not honor cancellation")
        .unwrap()
        .unwrap();
    assert_eq!(summary.ticks_sent, 0);
}

#[tokio::test]
async fn test_peer_close_terminates_loop_with_write_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let dir = tempfile::TempDir::new().unwrap();

    let client = MarketDataClient::new(test_config(addr, dir.path().join("m.csv"))).unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(client.run(cancel.clone()));

    // Accept then immediately drop the connection.
    let (stream, _) = listener.accept().await.unwrap();
    drop(stream);
    drop(listener);

    // The loop must notice within a few writes and exit with a write
    // error, not hang and not panic.
    let result = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("feeder did not notice peer close")
        .unwrap();
    assert!(matches!(result, Err(FeedError::Write(_))));
}
