//! Core domain types for the trading session runner.
//!
//! This crate provides fundamental types used throughout the session runner:
//! - `PriceTick`: one price observation (symbol, price, epoch timestamp)
//! - `SessionState`: lifecycle states of a supervised session
//! - `SessionOutcome`: terminal result of a session

pub mod error;
pub mod state;
pub mod tick;

pub use error::{CoreError, Result};
pub use state::{SessionOutcome, SessionState};
pub use tick::PriceTick;
