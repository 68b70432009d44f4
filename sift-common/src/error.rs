//! Common error types for sift

use thiserror::Error;

/// Common result type for sift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every sift component
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed record or malformed input parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure during scan, upsert, delete or file handling
    #[error("Processing error: {0}")]
    Processing(String),

    /// Explicit decline at the confirmation prompt
    #[error("Operation cancelled by user")]
    UserCancelled,

    /// Transport failure talking to the index service
    #[error("Network error: {0}")]
    Network(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything that fits no other category
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Short stable label used in summaries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Config(_) => "config",
            Error::Processing(_) | Error::Io(_) | Error::Json(_) => "processing",
            Error::UserCancelled => "cancelled",
            Error::Network(_) => "network",
            Error::Unknown(_) => "unknown",
        }
    }

    /// Process exit code for this error.
    ///
    /// Cancellation is a clean exit but still non-zero so scripts can tell
    /// that nothing was applied.
    pub fn exit_code(&self) -> i32 {
        1
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::UserCancelled)
    }
}
