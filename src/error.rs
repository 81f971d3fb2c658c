//! Error types for Medley.

use thiserror::Error;

/// Library-level error type for Medley operations.
#[derive(Error, Debug)]
pub enum MedleyError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Conversion failed: {0}")]
    ConversionFailure(String),

    #[error("Decode failed: {0}")]
    DecodeFailure(String),

    #[error("Recognition failed: {0}")]
    RecognitionFailure(String),

    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("No working model found: {0}")]
    ModelUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Model service error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Medley operations.
pub type Result<T> = std::result::Result<T, MedleyError>;
