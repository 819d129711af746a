//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Build step '{step}' failed ({command}): {output}")]
    Build {
        step: String,
        command: String,
        output: String,
    },

    #[error("Process error: {0}")]
    Proc(#[from] runsess_proc::ProcError),

    #[error("Feed error: {0}")]
    Feed(#[from] runsess_feed::FeedError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] runsess_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
