//! Error types for the core library.

use thiserror::Error;

use crate::notify::NotifyError;
use crate::page::FetchError;

/// Errors that can end a check cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// The page could not be fetched.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The alert could not be delivered.
    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),

    /// Configuration is malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (rules or state file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
