//! Error types shared by store implementations

use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by graph and vector store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Graph engine call failed
    #[error("graph backend error: {0}")]
    Graph(String),

    /// Vector engine call failed
    #[error("vector backend error: {0}")]
    Vector(String),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A chunk upsert referenced a document that was never created
    #[error("document '{0}' does not exist")]
    MissingDocument(String),

    /// Stored data could not be decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}
