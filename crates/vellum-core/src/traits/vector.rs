//! Vector similarity index abstraction

use async_trait::async_trait;

use crate::document::Chunk;
use crate::error::StoreResult;
use crate::retrieval::SearchHit;

/// Embedding-backed chunk index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and persist chunks keyed by chunk id, carrying full metadata so
    /// `chunk_id`/`filename` can be recovered at query time. Re-indexing an
    /// existing id replaces it.
    async fn index(&self, chunks: &[Chunk]) -> StoreResult<()>;

    /// Top-k nearest chunks for `query`, ordered by descending similarity.
    /// An empty index or a failed engine call yields an empty list, not an
    /// error.
    async fn search(&self, query: &str, top_k: usize) -> StoreResult<Vec<SearchHit>>;

    /// Drop all indexed vectors. Maintenance/testing only.
    async fn reset(&self) -> StoreResult<()>;
}
