//! Socket-forwarding ingestion loop.
//!
//! Connects to the engine's ingestion endpoint (retrying indefinitely
//! until it listens), then per iteration: acquire one tick, forward it as
//! one JSON line, append it to the bounded buffer, rewrite the CSV
//! snapshot every `flush_interval` accepted ticks, sleep out the pacing
//! interval. The loop is the sole writer to both the socket and the
//! buffer, so no locking is involved.

use crate::buffer::{TickBuffer, DEFAULT_CAPACITY};
use crate::error::{FeedError, FeedResult};
use crate::source::{LiveQuoteSource, SyntheticSource, TickSource, DEFAULT_QUOTE_URL};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Engine ingestion endpoint.
    pub engine_addr: String,
    /// Symbol stamped on produced ticks.
    pub symbol: String,
    /// Query symbol sent to the quote endpoint.
    pub query_symbol: String,
    /// Upstream quote endpoint.
    pub quote_url: String,
    /// Skip the live fetch entirely (automated runs).
    pub synthetic_only: bool,
    /// Seed for the synthetic generator; `None` uses entropy.
    pub synthetic_seed: Option<u64>,
    /// Buffer capacity (FIFO window size).
    pub buffer_capacity: usize,
    /// Snapshot rewrite cadence, in accepted ticks.
    pub flush_interval: usize,
    /// Sleep between iterations.
    pub pace: Duration,
    /// Extra sleep charged after a failed live fetch.
    pub penalty_delay: Duration,
    /// Delay between connection attempts while the engine is not listening.
    pub retry_delay: Duration,
    /// Snapshot file path.
    pub snapshot_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            engine_addr: "127.0.0.1:9999".to_string(),
            symbol: "BTC".to_string(),
            query_symbol: "BTCUSDT".to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            synthetic_only: false,
            synthetic_seed: None,
            buffer_capacity: DEFAULT_CAPACITY,
            flush_interval: 10,
            pace: Duration::from_secs(1),
            penalty_delay: Duration::from_secs(5),
            retry_delay: Duration::from_secs(1),
            snapshot_path: PathBuf::from("market_data.csv"),
        }
    }
}

/// What the loop did before exiting. Used by the supervisor's teardown log
/// and by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Ticks accepted (forwarded and buffered).
    pub ticks_sent: u64,
    /// Snapshot rewrites performed.
    pub flushes: u64,
}

/// Market data streaming client.
pub struct MarketDataClient {
    config: FeedConfig,
    source: TickSource,
    buffer: TickBuffer,
    /// Accepted ticks since the last snapshot. Plain field: there is
    /// exactly one ingestion loop per session.
    flush_counter: usize,
    summary: FeedSummary,
}

impl MarketDataClient {
    pub fn new(config: FeedConfig) -> FeedResult<Self> {
        let synthetic = SyntheticSource::with_params(
            config.symbol.clone(),
            29500.0,
            100.0,
            config.synthetic_seed,
        );
        let source = if config.synthetic_only {
            info!("Live fetch disabled, running synthetic-only");
            TickSource::synthetic_only(synthetic)
        } else {
            let live = LiveQuoteSource::new(
                config.quote_url.clone(),
                config.query_symbol.clone(),
                config.symbol.clone(),
            )?;
            TickSource::live(live, synthetic)
        };

        let buffer = TickBuffer::new(config.buffer_capacity);

        Ok(Self {
            config,
            source,
            buffer,
            flush_counter: 0,
            summary: FeedSummary::default(),
        })
    }

    /// Connect to the engine, retrying until it listens or the token is
    /// cancelled. Returns `None` when cancelled before a connection was
    /// established.
    async fn connect(&self, cancel: &CancellationToken) -> Option<TcpStream> {
        loop {
            match TcpStream::connect(&self.config.engine_addr).await {
                Ok(stream) => {
                    info!(addr = %self.config.engine_addr, "Connected to engine ingestion socket");
                    return Some(stream);
                }
                Err(e) => {
                    debug!(addr = %self.config.engine_addr, ?e, "Engine not listening yet, retrying");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancelled while waiting for engine to listen");
                    return None;
                }
                _ = tokio::time::sleep(self.config.retry_delay) => {}
            }
        }
    }

    /// Run the ingestion loop until cancelled or the socket write fails.
    ///
    /// A write failure terminates this loop only; the supervisor observes
    /// the exit during normal teardown rather than treating it as a
    /// session-level failure.
    pub async fn run(mut self, cancel: CancellationToken) -> FeedResult<FeedSummary> {
        let Some(mut stream) = self.connect(&cancel).await else {
            return Ok(self.summary);
        };

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let acquired = tokio::select! {
                _ = cancel.cancelled() => break,
                tick = self.source.acquire() => tick,
            };

            let Some(tick) = acquired else {
                // Live fetch failed this iteration; charge the penalty and
                // let the next iteration fall back to synthetic.
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.penalty_delay) => {}
                }
                continue;
            };

            let line = tick.to_wire_line()?;
            if let Err(e) = stream.write_all(line.as_bytes()).await {
                error!(?e, ticks_sent = self.summary.ticks_sent, "Socket write failed, stopping feeder");
                // Last full snapshot is the durability guarantee; try one
                // more so the window on disk is as fresh as possible.
                if let Err(snap_err) = self.buffer.snapshot_csv(&self.config.snapshot_path) {
                    warn!(?snap_err, "Final snapshot failed");
                }
                return Err(FeedError::Write(e));
            }

            self.buffer.push(tick);
            self.summary.ticks_sent += 1;
            self.flush_counter += 1;

            if self.flush_counter >= self.config.flush_interval {
                self.buffer.snapshot_csv(&self.config.snapshot_path)?;
                self.summary.flushes += 1;
                self.flush_counter = 0;
                debug!(
                    rows = self.buffer.len(),
                    flushes = self.summary.flushes,
                    "Periodic snapshot flushed"
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.pace) => {}
            }
        }

        info!(
            ticks_sent = self.summary.ticks_sent,
            flushes = self.summary.flushes,
            "Feeder loop stopped"
        );
        Ok(self.summary)
    }
}
