//! Error types for card_sync

use thiserror::Error;

/// Unified error type for card_sync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse a JSON response
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Image bytes could not be decoded
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),
    /// Database operation failed
    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Result alias for card_sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
