//! Error types for the notification bus

use thiserror::Error;

/// Notification bus error
#[derive(Debug, Error)]
pub enum Error {
    /// Dispatch error (consumer gone, transport refused the event)
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
