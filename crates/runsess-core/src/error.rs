//! Core error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
