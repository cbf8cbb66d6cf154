//! In-memory mock stores
//!
//! Designed like the production stores they stand in for:
//!
//! - **Deterministic**: stable iteration order, no randomness
//! - **Observable**: call counters for asserting interaction contracts
//! - **Faithful**: merge-by-id upserts, flattened properties, capped
//!   undirected traversal

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{Chunk, JsonMap};
use crate::entity::{ExtractedEntity, ExtractedRelationship};
use crate::error::{StoreError, StoreResult};
use crate::properties::{flatten_properties, properties_to_json};
use crate::retrieval::{GraphNode, SearchHit, StoredChunk};
use crate::traits::graph::TRAVERSAL_NODE_CAP;
use crate::traits::{GraphStore, VectorIndex};

#[derive(Debug, Clone)]
struct NodeRecord {
    labels: Vec<String>,
    properties: JsonMap,
}

type EdgeKey = (String, String, String);

/// In-memory graph store with merge-by-id semantics and BFS traversal.
#[derive(Default)]
pub struct MockGraphStore {
    nodes: Mutex<HashMap<String, NodeRecord>>,
    edges: Mutex<BTreeSet<EdgeKey>>,
    traverse_calls: AtomicUsize,
}

impl MockGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total node count, for idempotence assertions.
    pub fn node_count(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    /// Total edge count, for idempotence assertions.
    pub fn edge_count(&self) -> usize {
        self.edges.lock().unwrap().len()
    }

    /// How many times `traverse` was called.
    pub fn traverse_calls(&self) -> usize {
        self.traverse_calls.load(Ordering::SeqCst)
    }

    /// Properties of a node, for assertions.
    pub fn node_properties(&self, id: &str) -> Option<JsonMap> {
        self.nodes
            .lock()
            .unwrap()
            .get(id)
            .map(|n| n.properties.clone())
    }

    /// Whether an edge (from, to, type) exists.
    pub fn has_edge(&self, from: &str, to: &str, rel_type: &str) -> bool {
        self.edges.lock().unwrap().contains(&(
            from.to_string(),
            to.to_string(),
            rel_type.to_string(),
        ))
    }

    fn merge_node(&self, id: &str, label: &str, properties: JsonMap) {
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get_mut(id) {
            Some(existing) => {
                if !existing.labels.iter().any(|l| l == label) {
                    existing.labels.push(label.to_string());
                }
                for (key, value) in properties {
                    existing.properties.insert(key, value);
                }
            }
            None => {
                nodes.insert(
                    id.to_string(),
                    NodeRecord {
                        labels: vec![label.to_string()],
                        properties,
                    },
                );
            }
        }
    }

    fn merge_edge(&self, from: &str, to: &str, rel_type: &str) {
        self.edges.lock().unwrap().insert((
            from.to_string(),
            to.to_string(),
            rel_type.to_string(),
        ));
    }

    fn undirected_neighbors(&self, id: &str) -> Vec<String> {
        let edges = self.edges.lock().unwrap();
        let mut neighbors = Vec::new();
        for (from, to, _) in edges.iter() {
            if from == id {
                neighbors.push(to.clone());
            } else if to == id {
                neighbors.push(from.clone());
            }
        }
        neighbors
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn upsert_document(
        &self,
        id: &str,
        filename: &str,
        metadata: &JsonMap,
    ) -> StoreResult<()> {
        let is_new = !self.nodes.lock().unwrap().contains_key(id);

        let mut properties = properties_to_json(&flatten_properties(metadata));
        properties.insert("filename".into(), Value::from(filename));
        if is_new {
            properties.insert(
                "created_at".into(),
                Value::from(chrono::Utc::now().to_rfc3339()),
            );
        }
        self.merge_node(id, "Document", properties);
        Ok(())
    }

    async fn upsert_chunk(&self, chunk: &Chunk, document_id: &str) -> StoreResult<()> {
        if !self.nodes.lock().unwrap().contains_key(document_id) {
            return Err(StoreError::MissingDocument(document_id.to_string()));
        }

        let mut properties = JsonMap::new();
        properties.insert("text".into(), Value::from(chunk.text.clone()));
        properties.insert("index".into(), Value::from(chunk.index as i64));
        for (key, value) in properties_to_json(&flatten_properties(&chunk.metadata)) {
            if matches!(key.as_str(), "chunk_id" | "text" | "chunk_index") {
                continue;
            }
            properties.insert(key, value);
        }

        self.merge_node(&chunk.id, "Chunk", properties);
        self.merge_edge(&chunk.id, document_id, "BELONGS_TO");
        Ok(())
    }

    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        chunk_id: &str,
    ) -> StoreResult<usize> {
        for entity in entities {
            let mut properties = properties_to_json(&flatten_properties(&entity.properties));
            properties.insert("name".into(), Value::from(entity.name.clone()));
            self.merge_node(&entity.id, entity.kind.as_label(), properties);
            self.merge_edge(&entity.id, chunk_id, "MENTIONED_IN");
        }
        Ok(entities.len())
    }

    async fn create_relationships(
        &self,
        relationships: &[ExtractedRelationship],
    ) -> StoreResult<usize> {
        let mut created = 0;
        for rel in relationships {
            let endpoints_exist = {
                let nodes = self.nodes.lock().unwrap();
                nodes.contains_key(&rel.from) && nodes.contains_key(&rel.to)
            };
            if !endpoints_exist {
                continue;
            }

            let rel_type = if rel.rel_type.is_empty() {
                "RELATES_TO"
            } else {
                rel.rel_type.as_str()
            };
            self.merge_edge(&rel.from, &rel.to, rel_type);
            created += 1;
        }
        Ok(created)
    }

    async fn traverse(
        &self,
        seed_chunk_ids: &[String],
        max_hops: u32,
    ) -> StoreResult<Vec<GraphNode>> {
        self.traverse_calls.fetch_add(1, Ordering::SeqCst);

        let seeds: BTreeSet<&String> = seed_chunk_ids.iter().collect();
        let mut visited: BTreeSet<String> = seed_chunk_ids.iter().cloned().collect();
        let mut queue: VecDeque<(String, String, u32)> = seed_chunk_ids
            .iter()
            .map(|seed| (seed.clone(), seed.clone(), 0))
            .collect();
        let mut reached = Vec::new();

        while let Some((current, origin, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for neighbor in self.undirected_neighbors(&current) {
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.insert(neighbor.clone());
                if !seeds.contains(&neighbor) {
                    reached.push((neighbor.clone(), origin.clone()));
                    if reached.len() >= TRAVERSAL_NODE_CAP {
                        queue.clear();
                        break;
                    }
                }
                queue.push_back((neighbor, origin.clone(), depth + 1));
            }
        }

        let nodes = self.nodes.lock().unwrap();
        let result = reached
            .into_iter()
            .filter_map(|(id, origin)| {
                let record = nodes.get(&id)?;
                let mut metadata = record.properties.clone();
                let name = metadata
                    .remove("name")
                    .and_then(|v| v.as_str().map(str::to_string));
                let text = metadata
                    .remove("text")
                    .and_then(|v| v.as_str().map(str::to_string));
                Some(GraphNode {
                    id,
                    labels: record.labels.clone(),
                    name,
                    text,
                    metadata,
                    source_chunk_id: origin,
                })
            })
            .collect();

        Ok(result)
    }

    async fn fetch_chunks(&self, chunk_ids: &[String]) -> StoreResult<Vec<StoredChunk>> {
        let nodes = self.nodes.lock().unwrap();
        let edges = self.edges.lock().unwrap();

        let mut chunks = Vec::new();
        for id in chunk_ids {
            let Some(record) = nodes.get(id) else {
                continue;
            };
            if !record.labels.iter().any(|l| l == "Chunk") {
                continue;
            }

            let mut metadata = record.properties.clone();
            let text = metadata
                .remove("text")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            metadata.remove("id");
            if let Some(index) = metadata.remove("index") {
                metadata.insert("chunk_index".into(), index);
            }

            let document_filename = edges
                .iter()
                .find(|(from, _, rel)| from == id && rel == "BELONGS_TO")
                .and_then(|(_, doc_id, _)| nodes.get(doc_id))
                .and_then(|doc| doc.properties.get("filename"))
                .and_then(|v| v.as_str().map(str::to_string));

            chunks.push(StoredChunk {
                id: id.clone(),
                text,
                metadata,
                document_filename,
            });
        }

        Ok(chunks)
    }

    async fn reset(&self) -> StoreResult<()> {
        self.nodes.lock().unwrap().clear();
        self.edges.lock().unwrap().clear();
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct IndexedRow {
    id: String,
    text: String,
    metadata: JsonMap,
}

/// In-memory vector index scoring by distinct-token overlap with the query.
///
/// Overlap scoring keeps tests deterministic and readable: a chunk matches a
/// query exactly when they share words, with ties broken by chunk id.
#[derive(Default)]
pub struct MockVectorIndex {
    rows: Mutex<Vec<IndexedRow>>,
    search_calls: AtomicUsize,
}

impl MockVectorIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `search` was called.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn tokens(text: &str) -> BTreeSet<String> {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn index(&self, chunks: &[Chunk]) -> StoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        for chunk in chunks {
            rows.retain(|row| row.id != chunk.id);
            rows.push(IndexedRow {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
            });
        }
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> StoreResult<Vec<SearchHit>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let query_tokens = Self::tokens(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.rows.lock().unwrap();
        let mut scored: Vec<(f32, IndexedRow)> = rows
            .iter()
            .filter_map(|row| {
                let overlap = Self::tokens(&row.text)
                    .intersection(&query_tokens)
                    .count();
                if overlap == 0 {
                    return None;
                }
                Some((overlap as f32 / query_tokens.len() as f32, row.clone()))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, row)| SearchHit {
                id: row.id,
                text: row.text,
                metadata: row.metadata,
                score: Some(score),
            })
            .collect())
    }

    async fn reset(&self) -> StoreResult<()> {
        self.rows.lock().unwrap().clear();
        Ok(())
    }
}
