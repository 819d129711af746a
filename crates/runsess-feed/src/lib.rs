//! Market data streaming client.
//!
//! The system's only sustained steady-state concurrency unit: a single
//! ingestion loop that acquires one price tick per iteration (live quote
//! API with a deterministic synthetic fallback), forwards it to the
//! engine's ingestion socket as one JSON line, keeps a bounded FIFO buffer
//! of recent ticks and rewrites a CSV snapshot of the buffer every few
//! accepted ticks.

pub mod buffer;
pub mod client;
pub mod error;
pub mod source;

pub use buffer::TickBuffer;
pub use client::{FeedConfig, FeedSummary, MarketDataClient};
pub use error::{FeedError, FeedResult};
pub use source::{LiveQuoteSource, SyntheticSource, TickSource};
