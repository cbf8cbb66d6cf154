//! Schema-aware graph store abstraction

use async_trait::async_trait;

use crate::document::{Chunk, JsonMap};
use crate::entity::{ExtractedEntity, ExtractedRelationship};
use crate::error::StoreResult;
use crate::retrieval::{GraphNode, StoredChunk};

/// Hard cap on nodes returned by a single traversal, regardless of fan-out.
/// Traversal results are a sampled neighborhood, not an exhaustive one.
pub const TRAVERSAL_NODE_CAP: usize = 100;

/// Idempotent, id-keyed CRUD over the property graph.
///
/// All upserts are merge-by-id: re-running any of them with identical inputs
/// produces no additional nodes or edges and identical final property state.
/// Implementations flatten metadata to the primitive-only property model at
/// the write boundary.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Merge a Document node by id, setting filename and flattened metadata.
    async fn upsert_document(&self, id: &str, filename: &str, metadata: &JsonMap)
        -> StoreResult<()>;

    /// Merge a Chunk node by id and ensure its containment edge to the
    /// document. The document must already exist; a missing document is a
    /// fatal ingestion error.
    async fn upsert_chunk(&self, chunk: &Chunk, document_id: &str) -> StoreResult<()>;

    /// Merge entity nodes by id under their kind label and ensure a
    /// mentioned-in edge to the chunk. Returns the number of entities
    /// written; malformed entries were already dropped upstream.
    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        chunk_id: &str,
    ) -> StoreResult<usize>;

    /// Merge relationships by (from, to, type), matching endpoints regardless
    /// of node kind. Relationships whose endpoints do not both exist are
    /// silently dropped — no implicit node creation. Returns the number
    /// actually created.
    async fn create_relationships(
        &self,
        relationships: &[ExtractedRelationship],
    ) -> StoreResult<usize>;

    /// Distinct nodes reachable from any seed chunk within `max_hops`
    /// undirected steps over any edge type, excluding the seeds themselves,
    /// capped at [`TRAVERSAL_NODE_CAP`]. Each node carries the seed chunk it
    /// was first reached from.
    async fn traverse(&self, seed_chunk_ids: &[String], max_hops: u32)
        -> StoreResult<Vec<GraphNode>>;

    /// Batch chunk lookup by id, reconstructing metadata from node properties
    /// minus the reserved `id`/`text`/`index` fields.
    async fn fetch_chunks(&self, chunk_ids: &[String]) -> StoreResult<Vec<StoredChunk>>;

    /// Destructive: detach-delete every node and edge. Maintenance/testing
    /// only.
    async fn reset(&self) -> StoreResult<()>;

    /// Connectivity probe for the liveness endpoint.
    async fn health_check(&self) -> StoreResult<()>;
}
