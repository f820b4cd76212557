//! Error types for postwatch
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in postwatch
#[derive(Debug, Error)]
pub enum WatchError {
    /// Cursor store unreachable or corrupt. Fatal: the monotonic-cursor
    /// invariant cannot be guaranteed without it.
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP fetch against the forum failed outright
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A discovery cycle exceeded its deadline before finding or exhausting
    #[error("Discovery cycle timed out after {0:?}")]
    CycleTimeout(std::time::Duration),

    /// Raw payload could not be parsed into a post record
    #[error("Parse error: {0}")]
    Parse(String),

    /// A registered handler failed while processing a post
    #[error("Handler '{name}' failed: {reason}")]
    Handler { name: String, reason: String },

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// The discovery queue closed while the pipeline was still running
    #[error("Discovery queue closed")]
    QueueClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for WatchError {
    fn from(e: rusqlite::Error) -> Self {
        WatchError::Storage(e.to_string())
    }
}

/// Result type alias for postwatch operations
pub type Result<T> = std::result::Result<T, WatchError>;
