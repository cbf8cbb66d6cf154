//! Error types for completion and embedding providers

use thiserror::Error;

/// Result alias for completion operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors from completion providers.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider answered but the body was unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider cannot be constructed from the given configuration
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors from embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider answered but the body was unusable
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider cannot be constructed from the given configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The provider returned a vector of an unexpected size
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimensions
        expected: usize,
        /// Dimensions actually returned
        actual: usize,
    },
}
