//! Hybrid retrieval: vector search seeding graph traversal
//!
//! The fusion order is a correctness contract: downstream synthesis must see
//! primary (vector) evidence before expansion evidence, and a chunk that is
//! both a vector seed and a traversal result appears exactly once, tagged
//! `vector`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vellum_core::{
    chunk_ids, ContextItem, ContextSource, GraphNode, GraphStore, RetrievalOutcome, SearchHit,
    StoreResult, StoredChunk, VectorIndex,
};

/// Orchestrates vector search + graph traversal into fused context.
pub struct HybridRetriever {
    vector: Arc<dyn VectorIndex>,
    graph: Arc<dyn GraphStore>,
}

impl HybridRetriever {
    /// Create a retriever over the two stores.
    pub fn new(vector: Arc<dyn VectorIndex>, graph: Arc<dyn GraphStore>) -> Self {
        Self { vector, graph }
    }

    /// Retrieve context for `query`.
    ///
    /// With no vector results there is nothing to seed the traversal, so all
    /// three result lists come back empty and no graph call is made.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        max_hops: u32,
    ) -> StoreResult<RetrievalOutcome> {
        info!("Step 1: vector similarity search for query: {}", query);
        let vector_results = self.vector.search(query, top_k).await?;

        if vector_results.is_empty() {
            warn!("No vector results found");
            return Ok(RetrievalOutcome::empty());
        }

        let seed_ids = chunk_ids(&vector_results);
        debug!("Found {} relevant chunks: {:?}", seed_ids.len(), seed_ids);

        info!(
            "Step 2: graph traversal from {} chunks (max {} hops)",
            seed_ids.len(),
            max_hops
        );
        let graph_context = self.graph.traverse(&seed_ids, max_hops).await?;
        info!("Found {} related nodes via graph traversal", graph_context.len());

        // Traversal carries chunk text opportunistically; re-fetch through the
        // store for authoritative text and current metadata
        let graph_chunk_ids: Vec<String> = graph_context
            .iter()
            .filter(|node| node.is_chunk())
            .map(|node| node.id.clone())
            .collect();
        let graph_chunks = if graph_chunk_ids.is_empty() {
            Vec::new()
        } else {
            self.graph.fetch_chunks(&graph_chunk_ids).await?
        };

        let combined_context =
            combine_context(&vector_results, &graph_chunks, &graph_context, &seed_ids);
        info!("Retrieved {} total context items", combined_context.len());

        Ok(RetrievalOutcome {
            vector_results,
            graph_context,
            combined_context,
        })
    }
}

/// Fuse the three result sets into ordered, provenance-tagged context.
///
/// Strict order: every vector result in engine rank order, then every
/// graph-traversed chunk not already in the seed set, then every non-chunk
/// traversal node. Pure so the ordering and dedup contracts are testable
/// without stores.
pub fn combine_context(
    vector_results: &[SearchHit],
    graph_chunks: &[StoredChunk],
    graph_nodes: &[GraphNode],
    seed_chunk_ids: &[String],
) -> Vec<ContextItem> {
    let seeds: BTreeSet<&str> = seed_chunk_ids.iter().map(String::as_str).collect();
    let mut combined = Vec::new();

    // Primary evidence
    for hit in vector_results {
        combined.push(ContextItem {
            source: ContextSource::Vector,
            text: hit.text.clone(),
            metadata: hit.metadata.clone(),
            score: hit.score,
            entity_kind: None,
            name: None,
            document_filename: None,
        });
    }

    // Expansion chunks, deduplicated against the seeds
    let mut seen_chunks = seeds.clone();
    for chunk in graph_chunks {
        if !seen_chunks.insert(chunk.id.as_str()) {
            continue;
        }
        combined.push(ContextItem {
            source: ContextSource::Graph,
            text: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
            score: None,
            entity_kind: None,
            name: None,
            document_filename: chunk.document_filename.clone(),
        });
    }

    // Entities and other non-chunk nodes
    for node in graph_nodes {
        if node.is_chunk() {
            continue;
        }
        combined.push(ContextItem {
            source: ContextSource::GraphEntity,
            text: node.text.clone().unwrap_or_default(),
            metadata: node.metadata.clone(),
            score: None,
            entity_kind: Some(
                node.primary_label()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            name: Some(node.name.clone().unwrap_or_default()),
            document_filename: None,
        });
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vellum_core::test_support::{MockGraphStore, MockVectorIndex};
    use vellum_core::{Chunk, EntityKind, ExtractedEntity, JsonMap};

    fn hit(id: &str, text: &str, score: f32) -> SearchHit {
        let mut metadata = JsonMap::new();
        metadata.insert("chunk_id".into(), json!(id));
        metadata.insert("filename".into(), json!("doc.txt"));
        SearchHit {
            id: id.into(),
            text: text.into(),
            metadata,
            score: Some(score),
        }
    }

    fn stored_chunk(id: &str, text: &str) -> StoredChunk {
        StoredChunk {
            id: id.into(),
            text: text.into(),
            metadata: JsonMap::new(),
            document_filename: Some("doc.txt".into()),
        }
    }

    fn entity_node(id: &str, label: &str, name: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            labels: vec![label.into()],
            name: Some(name.into()),
            text: None,
            metadata: JsonMap::new(),
            source_chunk_id: "seed".into(),
        }
    }

    #[test]
    fn vector_items_precede_graph_items() {
        let seeds = vec!["c0".to_string()];
        let combined = combine_context(
            &[hit("c0", "primary", 0.9)],
            &[stored_chunk("c1", "expansion")],
            &[entity_node("e1", "Policy", "Leave")],
            &seeds,
        );

        let tags: Vec<ContextSource> = combined.iter().map(|i| i.source).collect();
        assert_eq!(
            tags,
            vec![
                ContextSource::Vector,
                ContextSource::Graph,
                ContextSource::GraphEntity
            ]
        );

        let last_vector = tags
            .iter()
            .rposition(|t| *t == ContextSource::Vector)
            .unwrap();
        let first_graph = tags
            .iter()
            .position(|t| *t != ContextSource::Vector)
            .unwrap();
        assert!(last_vector < first_graph);
    }

    #[test]
    fn seed_chunks_are_not_duplicated() {
        let seeds = vec!["c0".to_string()];
        // c0 is both a vector seed and a traversal-reachable chunk
        let combined = combine_context(
            &[hit("c0", "primary", 0.9)],
            &[stored_chunk("c0", "primary"), stored_chunk("c1", "other")],
            &[],
            &seeds,
        );

        let c0_items: Vec<&ContextItem> = combined
            .iter()
            .filter(|item| {
                item.metadata.get("chunk_id") == Some(&json!("c0")) || item.text == "primary"
            })
            .collect();
        assert_eq!(c0_items.len(), 1);
        assert_eq!(c0_items[0].source, ContextSource::Vector);
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn entity_items_carry_kind_and_name() {
        let combined = combine_context(
            &[hit("c0", "t", 1.0)],
            &[],
            &[
                entity_node("e1", "Topic", "Benefits"),
                GraphNode {
                    id: "e2".into(),
                    labels: vec![],
                    name: None,
                    text: None,
                    metadata: JsonMap::new(),
                    source_chunk_id: "c0".into(),
                },
            ],
            &["c0".to_string()],
        );

        assert_eq!(combined[1].entity_kind.as_deref(), Some("Topic"));
        assert_eq!(combined[1].name.as_deref(), Some("Benefits"));
        assert_eq!(combined[2].entity_kind.as_deref(), Some("Unknown"));
    }

    #[tokio::test]
    async fn empty_vector_results_short_circuit() {
        let graph = Arc::new(MockGraphStore::new());
        let vector = Arc::new(MockVectorIndex::new());
        let retriever = HybridRetriever::new(vector.clone(), graph.clone());

        let outcome = retriever.retrieve("no matches", 5, 2).await.unwrap();

        assert!(outcome.vector_results.is_empty());
        assert!(outcome.graph_context.is_empty());
        assert!(outcome.combined_context.is_empty());
        // The traversal was never attempted
        assert_eq!(graph.traverse_calls(), 0);
    }

    #[tokio::test]
    async fn retrieval_expands_seeds_through_the_graph() {
        let graph = Arc::new(MockGraphStore::new());
        let vector = Arc::new(MockVectorIndex::new());

        graph
            .upsert_document("doc_a", "a.txt", &JsonMap::new())
            .await
            .unwrap();
        let mut metadata = JsonMap::new();
        metadata.insert("chunk_id".into(), json!("a_chunk_0"));
        metadata.insert("filename".into(), json!("a.txt"));
        let chunk = Chunk {
            id: "a_chunk_0".into(),
            text: "maternity leave policy".into(),
            index: 0,
            metadata,
        };
        graph.upsert_chunk(&chunk, "doc_a").await.unwrap();
        graph
            .upsert_entities(
                &[ExtractedEntity {
                    kind: EntityKind::Policy,
                    id: "a_chunk_0_policy_leave".into(),
                    name: "Leave policy".into(),
                    properties: JsonMap::new(),
                }],
                "a_chunk_0",
            )
            .await
            .unwrap();
        vector.index(std::slice::from_ref(&chunk)).await.unwrap();

        let retriever = HybridRetriever::new(vector, graph);
        let outcome = retriever.retrieve("maternity leave", 5, 2).await.unwrap();

        assert_eq!(outcome.vector_results.len(), 1);
        assert!(!outcome.graph_context.is_empty());

        // Fused context leads with the vector item and includes the entity
        assert_eq!(outcome.combined_context[0].source, ContextSource::Vector);
        assert!(outcome
            .combined_context
            .iter()
            .any(|item| item.source == ContextSource::GraphEntity
                && item.name.as_deref() == Some("Leave policy")));

        // The seed chunk appears exactly once, tagged vector
        let seed_occurrences = outcome
            .combined_context
            .iter()
            .filter(|item| item.text == "maternity leave policy")
            .count();
        assert_eq!(seed_occurrences, 1);
    }
}
