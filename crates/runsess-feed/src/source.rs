//! Tick sources.
//!
//! Two producers behind one `TickSource` front: a live HTTP quote fetch
//! and a deterministic synthetic generator used as fallback (or
//! exclusively, under automated runs where external dependencies are
//! unwanted). A failed live fetch is logged and charged a one-iteration
//! penalty; the loop itself never dies because of the upstream API.

use crate::error::{FeedError, FeedResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runsess_core::PriceTick;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default quote endpoint (Binance ticker price).
pub const DEFAULT_QUOTE_URL: &str = "https://api.binance.com/api/v3/ticker/price";

/// Timeout for one quote request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Synthetic baseline price and jitter bound.
const SYNTHETIC_BASELINE: f64 = 29500.0;
const SYNTHETIC_JITTER: f64 = 100.0;

/// Ticker response from the quote endpoint.
#[derive(Debug, Deserialize)]
struct TickerResponse {
    /// Price comes back as a decimal string.
    price: String,
}

/// Live quote source over HTTP.
pub struct LiveQuoteSource {
    client: reqwest::Client,
    url: String,
    /// Query symbol sent upstream (e.g., "BTCUSDT").
    query_symbol: String,
    /// Symbol stamped on produced ticks (e.g., "BTC").
    tick_symbol: String,
}

impl LiveQuoteSource {
    pub fn new(
        url: impl Into<String>,
        query_symbol: impl Into<String>,
        tick_symbol: impl Into<String>,
    ) -> FeedResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Fetch(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            query_symbol: query_symbol.into(),
            tick_symbol: tick_symbol.into(),
        })
    }

    /// Fetch one quote and stamp it with local time.
    pub async fn fetch(&self) -> FeedResult<PriceTick> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("symbol", self.query_symbol.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("request failed: {e}")))?;

        let ticker: TickerResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Fetch(format!("bad response body: {e}")))?;

        let price: f64 = ticker
            .price
            .parse()
            .map_err(|e| FeedError::Fetch(format!("unparseable price {:?}: {e}", ticker.price)))?;

        debug!(symbol = %self.tick_symbol, price, "Live quote fetched");
        Ok(PriceTick::now(self.tick_symbol.clone(), price))
    }
}

/// Deterministic synthetic tick generator: fixed baseline plus bounded
/// uniform jitter, rounded to two decimals.
pub struct SyntheticSource {
    symbol: String,
    baseline: f64,
    jitter: f64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_params(symbol, SYNTHETIC_BASELINE, SYNTHETIC_JITTER, None)
    }

    /// Fully parameterised constructor; a fixed seed gives a reproducible
    /// price sequence.
    pub fn with_params(
        symbol: impl Into<String>,
        baseline: f64,
        jitter: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            symbol: symbol.into(),
            baseline,
            jitter,
            rng,
        }
    }

    /// Produce the next synthetic tick.
    pub fn next_tick(&mut self) -> PriceTick {
        let offset = self.rng.gen_range(-self.jitter..=self.jitter);
        let price = ((self.baseline + offset) * 100.0).round() / 100.0;
        PriceTick::now(self.symbol.clone(), price)
    }
}

/// Combined source with live-preferred acquisition and synthetic fallback.
pub struct TickSource {
    live: Option<LiveQuoteSource>,
    synthetic: SyntheticSource,
    /// Set after a live fetch failure: the next acquisition skips the live
    /// path once instead of hammering a failing endpoint.
    fallback_next: bool,
}

impl TickSource {
    /// Live-preferred source.
    pub fn live(live: LiveQuoteSource, synthetic: SyntheticSource) -> Self {
        Self {
            live: Some(live),
            synthetic,
            fallback_next: false,
        }
    }

    /// Synthetic-only source (live fetch administratively disabled).
    pub fn synthetic_only(synthetic: SyntheticSource) -> Self {
        Self {
            live: None,
            synthetic,
            fallback_next: false,
        }
    }

    /// Whether the previous acquisition failed and incurred a penalty.
    pub fn penalized(&self) -> bool {
        self.fallback_next
    }

    /// Acquire one tick. Returns `None` when the live fetch failed this
    /// iteration; the caller applies the penalty delay and the next call
    /// falls back to the synthetic generator.
    pub async fn acquire(&mut self) -> Option<PriceTick> {
        if self.fallback_next {
            self.fallback_next = false;
            return Some(self.synthetic.next_tick());
        }

        match &self.live {
            None => Some(self.synthetic.next_tick()),
            Some(live) => match live.fetch().await {
                Ok(tick) => Some(tick),
                Err(e) => {
                    warn!(%e, "Live fetch failed, falling back to synthetic next iteration");
                    self.fallback_next = true;
                    None
                }
            },
        }
    }
}
