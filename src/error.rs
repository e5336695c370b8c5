//! CANOPY - Custom Error Types
//! Defines the error hierarchy for the hierarchical key-value store.

use thiserror::Error;

/// Custom Result type for canopy.
pub type Result<T> = std::result::Result<T, CanopyError>;

/// Error types for the canopy store.
#[derive(Error, Debug)]
pub enum CanopyError {
    /// Key is absent, or present but expired.
    #[error("key not found")]
    NotFound,

    /// The composed key is empty or one of its segments is malformed.
    #[error("bad key: {0}")]
    BadKey(String),

    /// The store has already been closed.
    #[error("store is closed")]
    Closed,

    /// A stored value is too short to carry the expiry header.
    #[error("data corruption detected: {0}")]
    Corruption(String),

    /// Errors raised by the embedded storage engine, passed through unchanged.
    #[error("engine error: {0}")]
    Engine(#[from] sled::Error),

    /// I/O errors from directory handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CanopyError {
    /// Returns true for the not-found case, expired keys included.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CanopyError::NotFound)
    }
}
