//! Process control error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcError {
    #[error("Failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Signal delivery to {name} failed: {reason}")]
    Signal { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProcResult<T> = Result<T, ProcError>;
