//! Bounded tick buffer with CSV snapshots.
//!
//! FIFO window over the most recent ticks: the oldest tick is dropped when
//! a new one arrives at capacity, so length never exceeds capacity. The
//! snapshot is a full-file rewrite (header + one row per buffered tick),
//! which keeps the file an exact image of the current window rather than an
//! ever-growing append log.

use crate::error::FeedResult;
use runsess_core::PriceTick;
use std::collections::VecDeque;
use std::path::Path;
use tracing::debug;

/// Default buffer capacity.
pub const DEFAULT_CAPACITY: usize = 2000;

/// Ordered, bounded sequence of recent price ticks.
#[derive(Debug)]
pub struct TickBuffer {
    capacity: usize,
    ticks: VecDeque<PriceTick>,
}

impl TickBuffer {
    /// Create an empty buffer. A zero capacity is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ticks: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a tick, evicting the oldest when at capacity. Returns the
    /// evicted tick, if any.
    pub fn push(&mut self, tick: PriceTick) -> Option<PriceTick> {
        let evicted = if self.ticks.len() == self.capacity {
            self.ticks.pop_front()
        } else {
            None
        };
        self.ticks.push_back(tick);
        evicted
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PriceTick> {
        self.ticks.iter()
    }

    /// Rewrite the snapshot file with the current buffer contents.
    ///
    /// Header `symbol,price,timestamp`, one row per tick, oldest first.
    /// Truncates and rewrites the whole file so it always reflects exactly
    /// the current sliding window.
    pub fn snapshot_csv(&self, path: impl AsRef<Path>) -> FeedResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["symbol", "price", "timestamp"])?;
        for tick in &self.ticks {
            writer.write_record([
                tick.symbol.as_str(),
                &tick.price.to_string(),
                &tick.timestamp.to_string(),
            ])?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = self.ticks.len(), "Snapshot rewritten");
        Ok(())
    }
}
