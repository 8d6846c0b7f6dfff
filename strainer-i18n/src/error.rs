//! Error types for message loading

use thiserror::Error;

/// Errors that can occur while loading message bundles.
#[derive(Debug, Error)]
pub enum I18nError {
    /// Message document has an unexpected shape
    #[error("Failed to parse message document: {0}")]
    ParseError(String),

    /// JSON parse error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}
