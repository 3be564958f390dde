//! Error types for the lending core
//!
//! The three business kinds (not-found, forbidden, conflict) stay
//! distinct variants so a front end can map them to 404/403/409 without
//! inspecting messages. Infrastructure failures (storage, serialization)
//! are separate variants and are never folded into the business kinds.

use thiserror::Error;

/// Result type for lending operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lending errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Book not found
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Caller lacks the required relationship to the book
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invariant violation (book already borrowed, loan already returned/approved)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
