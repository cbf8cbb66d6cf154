//! Query-time result types: search hits, traversal nodes, fused context

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::JsonMap;

/// One vector search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk id the vector was indexed under
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Full chunk metadata persisted alongside the vector
    pub metadata: JsonMap,
    /// Engine similarity score, higher is better
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Pull `chunk_id` out of each hit's metadata, skipping hits that lack it.
pub fn chunk_ids(results: &[SearchHit]) -> Vec<String> {
    results
        .iter()
        .filter_map(|hit| hit.metadata.get("chunk_id").and_then(|v| v.as_str()))
        .map(str::to_string)
        .collect()
}

/// A node reached by graph traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node id
    pub id: String,
    /// All labels on the node (`Chunk`, `Policy`, ...)
    pub labels: Vec<String>,
    /// `name` property, set on entity nodes
    pub name: Option<String>,
    /// `text` property, set on chunk nodes (carried opportunistically;
    /// callers re-fetch chunks for authoritative text)
    pub text: Option<String>,
    /// Remaining node properties
    pub metadata: JsonMap,
    /// Seed chunk this node was first reached from
    pub source_chunk_id: String,
}

impl GraphNode {
    /// Whether the node is a chunk.
    pub fn is_chunk(&self) -> bool {
        self.labels.iter().any(|l| l == "Chunk")
    }

    /// First label, used as the display kind for entity nodes.
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// A chunk fetched from the graph store by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Chunk id
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Node properties minus the reserved `id`/`text`/`index` fields
    pub metadata: JsonMap,
    /// Filename of the owning document, when resolvable
    pub document_filename: Option<String>,
}

/// Which retrieval stage produced a context item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Primary evidence from vector similarity search
    Vector,
    /// Expansion chunk reached by graph traversal
    Graph,
    /// Non-chunk graph node (entity) reached by traversal
    GraphEntity,
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ContextSource::Vector => "vector",
            ContextSource::Graph => "graph",
            ContextSource::GraphEntity => "graph_entity",
        };
        f.write_str(tag)
    }
}

/// One item of fused retrieval context, constructed per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    /// Provenance tag
    pub source: ContextSource,
    /// Item text (empty for entities without one)
    pub text: String,
    /// Item metadata
    pub metadata: JsonMap,
    /// Similarity score, for vector-sourced items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Entity kind, for `graph_entity` items
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_kind: Option<String>,
    /// Entity name, for `graph_entity` items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning document filename resolved from the graph, for `graph` items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_filename: Option<String>,
}

/// Everything a hybrid retrieval pass produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Raw vector search results, engine order
    pub vector_results: Vec<SearchHit>,
    /// Raw traversal results
    pub graph_context: Vec<GraphNode>,
    /// Fused, deduplicated, provenance-tagged context
    pub combined_context: Vec<ContextItem>,
}

impl RetrievalOutcome {
    /// Outcome with all three lists empty.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A cited source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    /// Document filename
    pub filename: String,
    /// Provenance of the first item that cited this document
    pub source_type: ContextSource,
    /// Chunk index of that item, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<i64>,
}

/// Retrieval counts reported for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalInfo {
    /// Number of vector search results
    pub vector_results_count: usize,
    /// Number of nodes reached by traversal
    pub graph_context_count: usize,
    /// Total fused context items
    pub total_context_items: usize,
}

/// A synthesized answer with its citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Answer text
    pub answer: String,
    /// Distinct source documents in first-seen order
    pub sources: Vec<SourceCitation>,
    /// Observability counts
    pub retrieval_info: RetrievalInfo,
}
