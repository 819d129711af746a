//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Live quote fetch failed: {0}")]
    Fetch(String),

    #[error("Socket write failed (peer closed?): {0}")]
    Write(std::io::Error),

    #[error("Snapshot write failed: {0}")]
    Snapshot(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] runsess_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
