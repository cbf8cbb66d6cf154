//! Ingestion orchestration
//!
//! One document at a time: parse → document node → chunk → per-chunk
//! {chunk node, extraction, entity nodes} → one batched relationship pass →
//! vector indexing.
//!
//! Relationship creation is deferred until after the last chunk because a
//! relationship's endpoints may span chunks processed earlier and later in
//! the same run. Extraction failures are absorbed per chunk; parse and store
//! failures abort the document and propagate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use vellum_core::{ExtractedRelationship, GraphStore, VectorIndex};
use vellum_extract::EntityExtractor;

use crate::chunker::DocumentChunker;
use crate::parser::DocumentParser;

/// Drives the ingestion of documents into the graph and vector stores.
pub struct IngestionPipeline {
    parser: Arc<dyn DocumentParser>,
    chunker: Arc<dyn DocumentChunker>,
    extractor: EntityExtractor,
    graph: Arc<dyn GraphStore>,
    vector: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    /// Wire up a pipeline from its collaborators.
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        chunker: Arc<dyn DocumentChunker>,
        extractor: EntityExtractor,
        graph: Arc<dyn GraphStore>,
        vector: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            parser,
            chunker,
            extractor,
            graph,
            vector,
        }
    }

    /// Ingest one document, returning its document id.
    pub async fn ingest(&self, path: &Path) -> Result<String> {
        info!("Starting ingestion of {}", path.display());

        let parsed = self.parser.parse(path).await?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "doc".to_string());
        let doc_id = format!("doc_{stem}");
        let filename = parsed
            .filename()
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());

        self.graph
            .upsert_document(&doc_id, &filename, &parsed.metadata)
            .await
            .with_context(|| format!("Failed to store document node {doc_id}"))?;

        let chunks = self.chunker.chunk(&parsed.text, &parsed.metadata);

        let mut all_relationships: Vec<ExtractedRelationship> = Vec::new();
        for chunk in &chunks {
            self.graph
                .upsert_chunk(chunk, &doc_id)
                .await
                .with_context(|| format!("Failed to store chunk {}", chunk.id))?;

            let (entities, relationships) = self.extractor.extract(&chunk.text, &chunk.id).await;

            if !entities.is_empty() {
                self.graph
                    .upsert_entities(&entities, &chunk.id)
                    .await
                    .with_context(|| format!("Failed to store entities for chunk {}", chunk.id))?;
            }
            all_relationships.extend(relationships);
        }

        if !all_relationships.is_empty() {
            self.graph
                .create_relationships(&all_relationships)
                .await
                .context("Failed to store relationships")?;
        }

        self.vector
            .index(&chunks)
            .await
            .context("Failed to index chunks")?;

        info!("Successfully ingested document {}", doc_id);
        Ok(doc_id)
    }

    /// Ingest documents sequentially, logging and skipping failures.
    /// Returns the ids of the documents that succeeded.
    pub async fn ingest_many(&self, paths: &[PathBuf]) -> Vec<String> {
        let mut doc_ids = Vec::new();
        for path in paths {
            match self.ingest(path).await {
                Ok(doc_id) => doc_ids.push(doc_id),
                Err(e) => {
                    error!("Failed to ingest {}: {:#}", path.display(), e);
                }
            }
        }
        doc_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::TempDir;
    use vellum_core::test_support::{MockGraphStore, MockVectorIndex};
    use vellum_llm::MockCompletionProvider;

    use crate::chunker::WindowChunker;
    use crate::parser::TextParser;

    struct Harness {
        pipeline: IngestionPipeline,
        graph: Arc<MockGraphStore>,
        vector: Arc<MockVectorIndex>,
        completion: Arc<MockCompletionProvider>,
        _dir: TempDir,
        dir_path: PathBuf,
    }

    fn harness() -> Harness {
        let graph = Arc::new(MockGraphStore::new());
        let vector = Arc::new(MockVectorIndex::new());
        let completion = Arc::new(MockCompletionProvider::with_default_response(
            r#"{"entities": [], "relationships": []}"#,
        ));

        let pipeline = IngestionPipeline::new(
            Arc::new(TextParser::new()),
            Arc::new(WindowChunker::new()),
            EntityExtractor::new(completion.clone()),
            graph.clone(),
            vector.clone(),
        );

        let dir = TempDir::new().unwrap();
        let dir_path = dir.path().to_path_buf();
        Harness {
            pipeline,
            graph,
            vector,
            completion,
            _dir: dir,
            dir_path,
        }
    }

    fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn ingest_populates_graph_and_vector_store() {
        let h = harness();
        h.completion.set_response(
            "maternity",
            r#"{
                "entities": [
                    {"type": "Policy", "id": "policy_leave", "name": "Maternity leave"}
                ],
                "relationships": [
                    {"from": "policy_leave", "to": "topic_family", "type": "RELATES_TO"}
                ]
            }"#,
        );

        let path = write_doc(
            &h.dir_path,
            "handbook.txt",
            "The maternity leave policy grants twelve weeks.",
        );

        let doc_id = h.pipeline.ingest(&path).await.unwrap();
        assert_eq!(doc_id, "doc_handbook");

        // Document, chunk and entity all landed in the graph
        assert!(h.graph.node_properties("doc_handbook").is_some());
        assert!(h.graph.node_properties("handbook_chunk_0").is_some());
        assert!(h
            .graph
            .node_properties("handbook_chunk_0_policy_leave")
            .is_some());
        assert!(h.graph.has_edge("handbook_chunk_0", "doc_handbook", "BELONGS_TO"));
        assert!(h.graph.has_edge(
            "handbook_chunk_0_policy_leave",
            "handbook_chunk_0",
            "MENTIONED_IN"
        ));

        // The relationship to the never-extracted topic endpoint dangles and
        // was dropped at the graph write
        assert!(!h.graph.has_edge(
            "handbook_chunk_0_policy_leave",
            "handbook_chunk_0_topic_family",
            "RELATES_TO"
        ));

        // Chunks are searchable
        assert_eq!(h.vector.len(), 1);
        let hits = h.vector.search("maternity leave", 5).await.unwrap();
        assert_eq!(hits[0].id, "handbook_chunk_0");
    }

    #[tokio::test]
    async fn extraction_failure_does_not_abort_ingestion() {
        let h = harness();
        h.completion.set_failure("LLM unavailable");

        let path = write_doc(&h.dir_path, "notes.txt", "Some note content here.");
        let doc_id = h.pipeline.ingest(&path).await.unwrap();

        assert_eq!(doc_id, "doc_notes");
        assert!(h.graph.node_properties("notes_chunk_0").is_some());
        assert_eq!(h.vector.len(), 1);
    }

    #[tokio::test]
    async fn reingestion_is_idempotent() {
        let h = harness();
        let path = write_doc(&h.dir_path, "stable.txt", "Stable content.");

        h.pipeline.ingest(&path).await.unwrap();
        let nodes = h.graph.node_count();
        let edges = h.graph.edge_count();
        let indexed = h.vector.len();

        h.pipeline.ingest(&path).await.unwrap();

        assert_eq!(h.graph.node_count(), nodes);
        assert_eq!(h.graph.edge_count(), edges);
        assert_eq!(h.vector.len(), indexed);
    }

    #[tokio::test]
    async fn unreadable_document_propagates_the_error() {
        let h = harness();
        let missing = h.dir_path.join("missing.txt");

        let err = h.pipeline.ingest(&missing).await.unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }

    #[tokio::test]
    async fn ingest_many_skips_failures() {
        let h = harness();
        let good_a = write_doc(&h.dir_path, "a.txt", "Document a content.");
        let missing = h.dir_path.join("gone.txt");
        let good_b = write_doc(&h.dir_path, "b.txt", "Document b content.");

        let ids = h.pipeline.ingest_many(&[good_a, missing, good_b]).await;
        assert_eq!(ids, vec!["doc_a", "doc_b"]);
    }
}
