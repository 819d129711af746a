//! Price tick type.
//!
//! One tick is one price observation from the upstream quote source (or the
//! synthetic generator). Ticks are immutable once created and serialize to
//! the wire format consumed by the engine's ingestion socket: one JSON
//! object per line with fields `symbol`, `price`, `timestamp`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Instrument symbol (e.g., "BTC").
    pub symbol: String,
    /// Observed price.
    pub price: f64,
    /// Observation time as epoch seconds (fractional).
    pub timestamp: f64,
}

impl PriceTick {
    /// Create a tick stamped with the current system time.
    pub fn now(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: epoch_now(),
        }
    }

    /// Create a tick with an explicit timestamp (epoch seconds).
    pub fn at(symbol: impl Into<String>, price: f64, timestamp: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }

    /// Serialize to the line-delimited wire format (JSON + trailing newline).
    pub fn to_wire_line(&self) -> crate::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Current time as fractional epoch seconds.
#[must_use]
pub fn epoch_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_line_shape() {
        let tick = PriceTick::at("BTC", 29512.25, 1700000000.5);
        let line = tick.to_wire_line().unwrap();
        assert!(line.ends_with('\n'));

        let parsed: PriceTick = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, tick);
    }

    #[test]
    fn test_wire_field_names() {
        let tick = PriceTick::at("BTC", 100.0, 1.0);
        let value: serde_json::Value = serde_json::to_value(&tick).unwrap();
        assert!(value.get("symbol").is_some());
        assert!(value.get("price").is_some());
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_now_is_monotonic_enough() {
        let a = PriceTick::now("BTC", 1.0);
        let b = PriceTick::now("BTC", 2.0);
        assert!(b.timestamp >= a.timestamp);
    }
}
