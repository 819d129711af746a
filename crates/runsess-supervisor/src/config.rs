//! Session configuration.
//!
//! Loaded from a TOML file; every field has a default so a missing or
//! partial (or unparseable) file degrades to the documented defaults
//! instead of aborting. The configuration is immutable once a session
//! starts.

use crate::error::{AppError, AppResult};
use runsess_feed::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Feed section of the session config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSection {
    /// Engine ingestion endpoint. Default: 127.0.0.1:9999.
    #[serde(default = "default_engine_addr")]
    pub engine_addr: String,
    /// Symbol stamped on ticks. Default: "BTC".
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Query symbol sent upstream. Default: "BTCUSDT".
    #[serde(default = "default_query_symbol")]
    pub query_symbol: String,
    /// Upstream quote endpoint.
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    /// Skip the live fetch entirely (automated runs). Default: false.
    #[serde(default)]
    pub synthetic: bool,
    /// Buffer capacity. Default: 2000.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Snapshot rewrite cadence in accepted ticks. Default: 10.
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
    /// Sleep between iterations (ms). Default: 1000.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    /// Extra sleep after a failed live fetch (ms). Default: 5000.
    #[serde(default = "default_penalty_ms")]
    pub penalty_delay_ms: u64,
    /// Delay between connection attempts (ms). Default: 1000.
    #[serde(default = "default_retry_ms")]
    pub retry_delay_ms: u64,
}

fn default_engine_addr() -> String {
    "127.0.0.1:9999".to_string()
}

fn default_symbol() -> String {
    "BTC".to_string()
}

fn default_query_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_quote_url() -> String {
    runsess_feed::source::DEFAULT_QUOTE_URL.to_string()
}

fn default_buffer_capacity() -> usize {
    2000
}

fn default_flush_interval() -> usize {
    10
}

fn default_pace_ms() -> u64 {
    1_000
}

fn default_penalty_ms() -> u64 {
    5_000
}

fn default_retry_ms() -> u64 {
    1_000
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            engine_addr: default_engine_addr(),
            symbol: default_symbol(),
            query_symbol: default_query_symbol(),
            quote_url: default_quote_url(),
            synthetic: false,
            buffer_capacity: default_buffer_capacity(),
            flush_interval: default_flush_interval(),
            pace_ms: default_pace_ms(),
            penalty_delay_ms: default_penalty_ms(),
            retry_delay_ms: default_retry_ms(),
        }
    }
}

/// Build section: the opaque build collaborator plus the optional
/// pre-build code generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Build command; invoked as `<command> clean` then `<command> all`.
    #[serde(default = "default_build_command")]
    pub command: String,
    /// Optional generator argv run once before the build.
    #[serde(default)]
    pub generator: Option<Vec<String>>,
    /// Working directory for build and generator steps.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

fn default_build_command() -> String {
    "make".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            command: default_build_command(),
            generator: None,
            workdir: None,
        }
    }
}

/// Shutdown escalation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownSection {
    /// Grace period after creating the stop sentinel (ms). Default: 3000.
    #[serde(default = "default_sentinel_grace_ms")]
    pub sentinel_grace_ms: u64,
    /// Grace period after SIGTERM before SIGKILL (ms). Default: 5000.
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,
}

fn default_sentinel_grace_ms() -> u64 {
    3_000
}

fn default_terminate_grace_ms() -> u64 {
    5_000
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            sentinel_grace_ms: default_sentinel_grace_ms(),
            terminate_grace_ms: default_terminate_grace_ms(),
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long the engine runs before shutdown begins (seconds).
    #[serde(default = "default_run_duration_secs")]
    pub run_duration_secs: u64,
    /// Monitor sampling interval (seconds).
    #[serde(default = "default_sampling_interval_secs")]
    pub sampling_interval_secs: u64,
    /// Monitor trend aggregation window size.
    #[serde(default = "default_trend_aggregation_size")]
    pub trend_aggregation_size: u64,
    /// Directory for all session artifacts.
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,
    /// Engine executable, launched with no arguments.
    #[serde(default = "default_engine_executable")]
    pub engine_executable: PathBuf,
    /// Stop sentinel path polled by the engine.
    #[serde(default = "default_sentinel_path")]
    pub sentinel_path: PathBuf,
    /// Pause after engine spawn before starting the feeder (ms).
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Margin added to the run duration to absorb the settle delay (ms).
    #[serde(default = "default_wait_margin_ms")]
    pub wait_margin_ms: u64,
    /// Monitor collaborator argv; empty disables monitoring.
    #[serde(default)]
    pub monitor_command: Vec<String>,
    /// Report collaborator argv; empty disables reporting.
    #[serde(default)]
    pub report_command: Vec<String>,

    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub shutdown: ShutdownSection,
}

fn default_run_duration_secs() -> u64 {
    40
}

fn default_sampling_interval_secs() -> u64 {
    1
}

fn default_trend_aggregation_size() -> u64 {
    60
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_engine_executable() -> PathBuf {
    PathBuf::from("output/trading_system")
}

fn default_sentinel_path() -> PathBuf {
    PathBuf::from("STOP_SIGNAL")
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_wait_margin_ms() -> u64 {
    3_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            run_duration_secs: default_run_duration_secs(),
            sampling_interval_secs: default_sampling_interval_secs(),
            trend_aggregation_size: default_trend_aggregation_size(),
            result_dir: default_result_dir(),
            engine_executable: default_engine_executable(),
            sentinel_path: default_sentinel_path(),
            settle_delay_ms: default_settle_delay_ms(),
            wait_margin_ms: default_wait_margin_ms(),
            monitor_command: Vec::new(),
            report_command: Vec::new(),
            build: BuildSection::default(),
            feed: FeedSection::default(),
            shutdown: ShutdownSection::default(),
        }
    }
}

impl SessionConfig {
    /// Load from a TOML file. A missing or unparseable file logs a warning
    /// and yields the full defaults.
    pub fn load_or_default(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path, %e, "Config parse failed, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path, %e, "Config not readable, using defaults");
                Self::default()
            }
        }
    }

    /// Validate invariants that defaults cannot repair.
    pub fn validate(&self) -> AppResult<()> {
        if self.run_duration_secs == 0 {
            return Err(AppError::Config(
                "run_duration_secs must be > 0".to_string(),
            ));
        }
        if self.trend_aggregation_size == 0 {
            return Err(AppError::Config(
                "trend_aggregation_size must be >= 1".to_string(),
            ));
        }
        if self.feed.flush_interval == 0 {
            return Err(AppError::Config(
                "feed.flush_interval must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn wait_margin(&self) -> Duration {
        Duration::from_millis(self.wait_margin_ms)
    }

    pub fn sentinel_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown.sentinel_grace_ms)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown.terminate_grace_ms)
    }

    /// Engine stdout/stderr capture file.
    pub fn result_file(&self) -> PathBuf {
        self.result_dir.join("result.txt")
    }

    /// Monitor raw samples CSV.
    pub fn raw_csv(&self) -> PathBuf {
        self.result_dir.join("monitor_raw.csv")
    }

    /// Monitor trend CSV.
    pub fn trend_csv(&self) -> PathBuf {
        self.result_dir.join("monitor_trend.csv")
    }

    /// Report output for the raw series.
    pub fn raw_plot(&self) -> PathBuf {
        self.result_dir.join("monitor_raw.png")
    }

    /// Report output for the trend series.
    pub fn trend_plot(&self) -> PathBuf {
        self.result_dir.join("monitor_trend.png")
    }

    /// Feeder snapshot CSV.
    pub fn snapshot_path(&self) -> PathBuf {
        self.result_dir.join("market_data.csv")
    }

    /// Derive the feed client configuration.
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            engine_addr: self.feed.engine_addr.clone(),
            symbol: self.feed.symbol.clone(),
            query_symbol: self.feed.query_symbol.clone(),
            quote_url: self.feed.quote_url.clone(),
            synthetic_only: self.feed.synthetic,
            synthetic_seed: None,
            buffer_capacity: self.feed.buffer_capacity,
            flush_interval: self.feed.flush_interval,
            pace: Duration::from_millis(self.feed.pace_ms),
            penalty_delay: Duration::from_millis(self.feed.penalty_delay_ms),
            retry_delay: Duration::from_millis(self.feed.retry_delay_ms),
            snapshot_path: self.snapshot_path(),
        }
    }

    /// Point all artifact paths into the given directory. Used by tests
    /// and `--result-dir` overrides.
    pub fn rebase(&mut self, dir: &Path) {
        self.result_dir = dir.to_path_buf();
        self.sentinel_path = dir.join("STOP_SIGNAL");
    }
}
