//! Session supervisor for the trading engine.
//!
//! Drives one complete session: build the engine, launch it as a server
//! with a performance monitor attached, stream market data into it, wait
//! out the configured duration, tear everything down through the
//! escalating shutdown protocol (stop sentinel, SIGTERM, SIGKILL) and
//! trigger report generation.

pub mod builder;
pub mod config;
pub mod error;
pub mod report;
pub mod supervisor;

pub use builder::BuildStep;
pub use config::SessionConfig;
pub use error::{AppError, AppResult};
pub use report::ReportTrigger;
pub use supervisor::SessionSupervisor;
