//! Error types shared across VList crates

use thiserror::Error;

/// Result type alias for VList operations
pub type Result<T> = std::result::Result<T, VlistError>;

/// Main error type for VList
#[derive(Error, Debug)]
pub enum VlistError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
}
