//! Error types for eventship.

use thiserror::Error;

/// Main error type.
#[derive(Error, Debug)]
pub enum ShipError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Collector responded with status {0}")]
    Status(u16),

    #[error("Shipper is closed")]
    Closed,

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Result alias.
pub type Result<T> = std::result::Result<T, ShipError>;
