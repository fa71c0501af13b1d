//! Error types for stickerchart-core

use thiserror::Error;

/// Main error type for the stickerchart-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An action was rejected before touching state
    #[error("invalid action: {0}")]
    Validation(String),

    /// Chart not found
    #[error("chart not found: {0}")]
    ChartNotFound(String),

    /// Person not found
    #[error("person not found: {0}")]
    PersonNotFound(String),

    /// Sticker not found
    #[error("sticker not found: {0}")]
    StickerNotFound(String),

    /// Quick action not found
    #[error("quick action not found: {0}")]
    QuickActionNotFound(String),
}

/// Result type alias for stickerchart-core
pub type Result<T> = std::result::Result<T, Error>;
