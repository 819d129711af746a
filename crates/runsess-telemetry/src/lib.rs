//! Structured logging for the trading session runner.
//!
//! Every handled error in the session is logged with enough context
//! (command, path, captured output) to diagnose without re-running, so the
//! subscriber is initialised before anything else in `main`.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
