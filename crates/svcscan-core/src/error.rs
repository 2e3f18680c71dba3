//! Error types for the SvcScan core library

use std::io;
use thiserror::Error;

/// Result type alias for SvcScan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error conditions surfaced to the caller
///
/// Per-connection failures during a scan are local to the probe task that
/// hit them and never take this form; only conditions that invalidate the
/// whole scan do.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid command-line argument value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid target specification
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Invalid port or port range
    #[error("Invalid port range: {0}")]
    InvalidPortRange(String),

    /// Target hostname could not be resolved
    #[error("Unable to resolve hostname: '{0}'")]
    TargetUnresolvable(String),

    /// Embedded port registry missing or unreadable
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// I/O errors with automatic conversion
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::ResourceUnavailable(format!("CSV parse error: {}", err))
    }
}
