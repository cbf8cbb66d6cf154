//! Neo4j graph store

use std::collections::BTreeSet;

use async_trait::async_trait;
use neo4rs::{query, BoltType, Graph, Node, Query};
use tracing::{debug, info, warn};

use vellum_config::Neo4jConfig;
use vellum_core::traits::graph::TRAVERSAL_NODE_CAP;
use vellum_core::{
    flatten_properties, Chunk, ExtractedEntity, ExtractedRelationship, GraphNode, GraphStore,
    JsonMap, StoreError, StoreResult, StoredChunk,
};

use crate::params::{bolt_value, property_key, relationship_type};

/// Graph store backed by Neo4j.
///
/// Holds a pooled [`Graph`] handle; every operation acquires its own session,
/// so one store instance is safe to share across concurrent callers.
pub struct Neo4jStore {
    graph: Graph,
}

fn graph_err(e: neo4rs::Error) -> StoreError {
    StoreError::Graph(e.to_string())
}

impl Neo4jStore {
    /// Connect to Neo4j and ensure id-uniqueness constraints exist.
    pub async fn connect(config: &Neo4jConfig) -> StoreResult<Self> {
        let graph = Graph::new(config.uri.as_str(), config.user.as_str(), config.password.as_str())
            .await
            .map_err(graph_err)?;

        let store = Self { graph };
        store.ensure_constraints().await;
        info!("Connected to Neo4j at {}", config.uri);
        Ok(store)
    }

    /// Create unique-id constraints for every node label we write.
    async fn ensure_constraints(&self) {
        let constraints = [
            "CREATE CONSTRAINT document_id IF NOT EXISTS FOR (d:Document) REQUIRE d.id IS UNIQUE",
            "CREATE CONSTRAINT chunk_id IF NOT EXISTS FOR (ch:Chunk) REQUIRE ch.id IS UNIQUE",
            "CREATE CONSTRAINT policy_id IF NOT EXISTS FOR (p:Policy) REQUIRE p.id IS UNIQUE",
            "CREATE CONSTRAINT section_id IF NOT EXISTS FOR (s:Section) REQUIRE s.id IS UNIQUE",
            "CREATE CONSTRAINT topic_id IF NOT EXISTS FOR (t:Topic) REQUIRE t.id IS UNIQUE",
            "CREATE CONSTRAINT concept_id IF NOT EXISTS FOR (c:Concept) REQUIRE c.id IS UNIQUE",
        ];

        for constraint in constraints {
            if let Err(e) = self.graph.run(query(constraint)).await {
                debug!("Constraint might already exist: {}", e);
            }
        }
        debug!("Neo4j constraints ensured");
    }

    /// Build `SET` clauses and parameters for a flattened metadata map.
    ///
    /// `reserved` keys are handled by the caller and skipped here; keys that
    /// collide after sanitisation are applied first-wins.
    fn metadata_set_clauses(
        node_var: &str,
        metadata: &JsonMap,
        reserved: &[&str],
        set_clauses: &mut Vec<String>,
        params: &mut Vec<(String, BoltType)>,
    ) {
        let mut seen = BTreeSet::new();
        for (key, value) in &flatten_properties(metadata) {
            if reserved.contains(&key.as_str()) {
                continue;
            }
            let prop = property_key(key);
            if reserved.contains(&prop.as_str()) || !seen.insert(prop.clone()) {
                continue;
            }
            let param_name = format!("meta_{prop}");
            set_clauses.push(format!("{node_var}.{prop} = ${param_name}"));
            params.push((param_name, bolt_value(value)));
        }
    }

    fn build_query(cypher: String, params: Vec<(String, BoltType)>) -> Query {
        let mut q = query(&cypher);
        for (name, value) in params {
            q = q.param(&name, value);
        }
        q
    }

    fn node_properties(node: &Node) -> JsonMap {
        let mut properties = JsonMap::new();
        for key in node.keys() {
            // Skip values that do not translate to JSON (temporal/spatial
            // types never written by this store)
            if let Ok(value) = node.get::<serde_json::Value>(key) {
                properties.insert(key.to_string(), value);
            }
        }
        properties
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn upsert_document(
        &self,
        id: &str,
        filename: &str,
        metadata: &JsonMap,
    ) -> StoreResult<()> {
        let mut set_clauses = vec![
            "d.filename = $filename".to_string(),
            "d.created_at = coalesce(d.created_at, $created_at)".to_string(),
        ];
        let mut params: Vec<(String, BoltType)> = vec![
            ("doc_id".to_string(), id.into()),
            ("filename".to_string(), filename.into()),
            (
                "created_at".to_string(),
                chrono::Utc::now().to_rfc3339().into(),
            ),
        ];
        Self::metadata_set_clauses(
            "d",
            metadata,
            &["id", "filename", "created_at"],
            &mut set_clauses,
            &mut params,
        );

        let cypher = format!(
            "MERGE (d:Document {{id: $doc_id}})\nSET {}\nRETURN d.id as id",
            set_clauses.join(", ")
        );
        self.graph
            .run(Self::build_query(cypher, params))
            .await
            .map_err(graph_err)?;

        debug!("Upserted document {}", id);
        Ok(())
    }

    async fn upsert_chunk(&self, chunk: &Chunk, document_id: &str) -> StoreResult<()> {
        let mut set_clauses = vec![
            "ch.text = $text".to_string(),
            "ch.index = $chunk_index".to_string(),
        ];
        let mut params: Vec<(String, BoltType)> = vec![
            ("chunk_id".to_string(), chunk.id.as_str().into()),
            ("text".to_string(), chunk.text.as_str().into()),
            ("chunk_index".to_string(), (chunk.index as i64).into()),
            ("doc_id".to_string(), document_id.into()),
        ];
        Self::metadata_set_clauses(
            "ch",
            &chunk.metadata,
            &["id", "chunk_id", "text", "index", "chunk_index"],
            &mut set_clauses,
            &mut params,
        );

        let cypher = format!(
            "MERGE (ch:Chunk {{id: $chunk_id}})\n\
             SET {}\n\
             WITH ch\n\
             MATCH (d:Document {{id: $doc_id}})\n\
             MERGE (ch)-[:BELONGS_TO]->(d)\n\
             RETURN ch.id as id",
            set_clauses.join(", ")
        );

        let mut result = self
            .graph
            .execute(Self::build_query(cypher, params))
            .await
            .map_err(graph_err)?;

        if result.next().await.map_err(graph_err)?.is_none() {
            return Err(StoreError::MissingDocument(document_id.to_string()));
        }

        debug!("Upserted chunk {}", chunk.id);
        Ok(())
    }

    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        chunk_id: &str,
    ) -> StoreResult<usize> {
        for entity in entities {
            let mut set_clauses = vec!["e.name = $name".to_string()];
            let mut params: Vec<(String, BoltType)> = vec![
                ("entity_id".to_string(), entity.id.as_str().into()),
                ("name".to_string(), entity.name.as_str().into()),
                ("chunk_id".to_string(), chunk_id.into()),
            ];
            Self::metadata_set_clauses(
                "e",
                &entity.properties,
                &["id", "name"],
                &mut set_clauses,
                &mut params,
            );

            // Entity kinds are a closed enum, so the label is safe to
            // interpolate
            let cypher = format!(
                "MERGE (e:{label} {{id: $entity_id}})\n\
                 SET {set}\n\
                 WITH e\n\
                 MATCH (ch:Chunk {{id: $chunk_id}})\n\
                 MERGE (e)-[:MENTIONED_IN]->(ch)",
                label = entity.kind.as_label(),
                set = set_clauses.join(", ")
            );

            self.graph
                .run(Self::build_query(cypher, params))
                .await
                .map_err(graph_err)?;
        }

        info!("Upserted {} entity nodes for chunk {}", entities.len(), chunk_id);
        Ok(entities.len())
    }

    async fn create_relationships(
        &self,
        relationships: &[ExtractedRelationship],
    ) -> StoreResult<usize> {
        let mut created = 0;

        for rel in relationships {
            if rel.from.is_empty() || rel.to.is_empty() {
                continue;
            }

            let rel_type = relationship_type(&rel.rel_type);
            let mut set_clauses = Vec::new();
            let mut params: Vec<(String, BoltType)> = vec![
                ("from_id".to_string(), rel.from.as_str().into()),
                ("to_id".to_string(), rel.to.as_str().into()),
            ];
            {
                let mut seen = BTreeSet::new();
                for (key, value) in &flatten_properties(&rel.properties) {
                    let prop = property_key(key);
                    if !seen.insert(prop.clone()) {
                        continue;
                    }
                    let param_name = format!("prop_{prop}");
                    set_clauses.push(format!("r.{prop} = ${param_name}"));
                    params.push((param_name, bolt_value(value)));
                }
            }

            let set = if set_clauses.is_empty() {
                String::new()
            } else {
                format!("SET {}\n", set_clauses.join(", "))
            };
            // Match endpoints regardless of node kind; zero rows means a
            // dangling endpoint and the relationship is dropped
            let cypher = format!(
                "MATCH (a {{id: $from_id}})\n\
                 MATCH (b {{id: $to_id}})\n\
                 MERGE (a)-[r:{rel_type}]->(b)\n\
                 {set}RETURN type(r) as rel_type",
            );

            let mut result = self
                .graph
                .execute(Self::build_query(cypher, params))
                .await
                .map_err(graph_err)?;

            if result.next().await.map_err(graph_err)?.is_some() {
                created += 1;
            } else {
                debug!(
                    "Dropped relationship {} -[{}]-> {}: endpoint missing",
                    rel.from, rel_type, rel.to
                );
            }
        }

        info!(
            "Created {} of {} relationships",
            created,
            relationships.len()
        );
        Ok(created)
    }

    async fn traverse(
        &self,
        seed_chunk_ids: &[String],
        max_hops: u32,
    ) -> StoreResult<Vec<GraphNode>> {
        if seed_chunk_ids.is_empty() || max_hops == 0 {
            return Ok(Vec::new());
        }

        let cypher = format!(
            "MATCH path = (ch:Chunk)-[*1..{max_hops}]-(related)\n\
             WHERE ch.id IN $chunk_ids AND NOT related.id IN $chunk_ids\n\
             WITH DISTINCT related, ch\n\
             RETURN related as node, related.id as id, related.name as name,\n\
                    related.text as text, ch.id as source_chunk_id\n\
             LIMIT {cap}",
            cap = TRAVERSAL_NODE_CAP
        );
        let q = query(&cypher).param("chunk_ids", seed_chunk_ids.to_vec());

        let mut result = self.graph.execute(q).await.map_err(graph_err)?;
        let mut seen = BTreeSet::new();
        let mut nodes = Vec::new();

        while let Some(row) = result.next().await.map_err(graph_err)? {
            let Ok(node) = row.get::<Node>("node") else {
                continue;
            };
            let Ok(id) = row.get::<String>("id") else {
                continue;
            };
            // A node reachable from several seeds appears once per seed;
            // first seen wins
            if !seen.insert(id.clone()) {
                continue;
            }

            let mut metadata = Self::node_properties(&node);
            metadata.remove("id");
            metadata.remove("name");
            metadata.remove("text");

            nodes.push(GraphNode {
                id,
                labels: node.labels().iter().map(|l| l.to_string()).collect(),
                name: row.get::<String>("name").ok(),
                text: row.get::<String>("text").ok(),
                metadata,
                source_chunk_id: row.get::<String>("source_chunk_id").unwrap_or_default(),
            });
        }

        debug!(
            "Traversal from {} seeds reached {} nodes",
            seed_chunk_ids.len(),
            nodes.len()
        );
        Ok(nodes)
    }

    async fn fetch_chunks(&self, chunk_ids: &[String]) -> StoreResult<Vec<StoredChunk>> {
        if chunk_ids.is_empty() {
            return Ok(Vec::new());
        }

        let q = query(
            "MATCH (ch:Chunk)\n\
             WHERE ch.id IN $chunk_ids\n\
             OPTIONAL MATCH (ch)-[:BELONGS_TO]->(d:Document)\n\
             RETURN ch as node, ch.id as id, ch.text as text,\n\
                    d.filename as document_filename",
        )
        .param("chunk_ids", chunk_ids.to_vec());

        let mut result = self.graph.execute(q).await.map_err(graph_err)?;
        let mut chunks = Vec::new();

        while let Some(row) = result.next().await.map_err(graph_err)? {
            let Ok(node) = row.get::<Node>("node") else {
                continue;
            };
            let Ok(id) = row.get::<String>("id") else {
                continue;
            };
            let text = row.get::<String>("text").unwrap_or_default();
            let document_filename = row.get::<String>("document_filename").ok();

            let mut metadata = Self::node_properties(&node);
            metadata.remove("id");
            metadata.remove("text");
            if let Some(index) = metadata.remove("index") {
                metadata.insert("chunk_index".to_string(), index);
            }

            chunks.push(StoredChunk {
                id,
                text,
                metadata,
                document_filename,
            });
        }

        Ok(chunks)
    }

    async fn reset(&self) -> StoreResult<()> {
        self.graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(graph_err)?;
        warn!("Cleared all nodes and relationships from Neo4j");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.graph
            .run(query("RETURN 1"))
            .await
            .map_err(graph_err)?;
        Ok(())
    }
}
