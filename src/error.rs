use std::io;
use thiserror::Error;

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Pool configuration is out of range.
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// IO error from reading a config file or spawning a worker thread.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Config file could not be deserialized.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The pool has been closed and no longer accepts tasks.
    #[error("Pool is closed")]
    Closed,
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
