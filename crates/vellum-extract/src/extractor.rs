//! Entity and relationship extraction from text chunks

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use vellum_core::{ExtractedEntity, ExtractedRelationship};
use vellum_llm::CompletionProvider;

use crate::response::{strip_code_fence, RawExtraction};

/// Upper bound on text submitted per extraction call, to bound cost and
/// latency.
const MAX_EXTRACTION_CHARS: usize = 4000;

/// How much of an unparseable response to keep in the log.
const RESPONSE_LOG_PREFIX_CHARS: usize = 200;

const EXTRACTION_PROMPT: &str = r#"You are an expert at extracting structured information from documents.

Given the following text chunk, extract entities and relationships.

Entity Types:
- Policy: Policies, rules, regulations mentioned
- Section: Document sections, chapters, parts
- Topic: Main topics or themes discussed
- Concept: Important concepts, ideas, terms

For each entity, provide:
- type: One of Policy, Section, Topic, Concept
- id: A unique identifier (e.g., "policy_maternity_leave", "topic_project_management")
- name: A short descriptive name
- properties: Any relevant metadata (optional)

For relationships, provide:
- from: Source entity ID
- to: Target entity ID
- type: Relationship type (e.g., "AFFECTS", "RELATES_TO", "CONTAINS", "REFERENCES")
- properties: Any relevant metadata (optional)

Text chunk:
{text}

Return ONLY a valid JSON object with this structure:
{
    "entities": [
        {"type": "Policy", "id": "...", "name": "...", "properties": {}},
        ...
    ],
    "relationships": [
        {"from": "entity_id_1", "to": "entity_id_2", "type": "AFFECTS", "properties": {}},
        ...
    ]
}"#;

/// Extracts entities (Policy, Section, Topic, Concept) and relationships
/// from chunk text via an injected completion provider.
pub struct EntityExtractor {
    provider: Arc<dyn CompletionProvider>,
}

impl EntityExtractor {
    /// Create an extractor over the given completion provider.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Extract entities and relationships from `text`.
    ///
    /// Entity ids are rewritten to `<chunk_id>_<id>` for global uniqueness:
    /// the extractor only ever sees one chunk, so the same real-world entity
    /// mentioned in two chunks becomes two nodes unless the model happens to
    /// reuse identical local ids. Relationship endpoints are resolved against
    /// this call's entity set; an endpoint not found locally is assumed to
    /// name an entity from the same chunk and gets the same prefix, which can
    /// leave a dangling edge when the model actually referenced another
    /// chunk. Dangling edges are dropped at the graph write.
    ///
    /// Never fails: any transport or parse problem yields two empty vectors.
    pub async fn extract(
        &self,
        text: &str,
        chunk_id: &str,
    ) -> (Vec<ExtractedEntity>, Vec<ExtractedRelationship>) {
        debug!("Extracting entities from chunk {}", chunk_id);

        let prompt =
            EXTRACTION_PROMPT.replace("{text}", truncate_chars(text, MAX_EXTRACTION_CHARS));

        let response = match self.provider.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!("Extraction call failed for chunk {}: {}", chunk_id, e);
                return (Vec::new(), Vec::new());
            }
        };

        let payload = strip_code_fence(&response);
        let raw: RawExtraction = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    "Failed to parse extraction response for chunk {}: {}. Response: {}",
                    chunk_id,
                    e,
                    truncate_chars(payload, RESPONSE_LOG_PREFIX_CHARS)
                );
                return (Vec::new(), Vec::new());
            }
        };

        self.validate(raw, chunk_id)
    }

    fn validate(
        &self,
        raw: RawExtraction,
        chunk_id: &str,
    ) -> (Vec<ExtractedEntity>, Vec<ExtractedRelationship>) {
        let mut entities = Vec::new();
        for raw_entity in raw.entities {
            let (Some(kind), Some(id)) = (raw_entity.kind, raw_entity.id) else {
                debug!("Dropping entity without type or id in chunk {}", chunk_id);
                continue;
            };
            let kind = match kind.parse() {
                Ok(kind) => kind,
                Err(_) => {
                    debug!("Dropping entity with unknown kind '{}' in chunk {}", kind, chunk_id);
                    continue;
                }
            };

            // Prefix with the chunk id to guarantee global uniqueness
            entities.push(ExtractedEntity {
                kind,
                id: format!("{chunk_id}_{id}"),
                name: raw_entity.name,
                properties: raw_entity.properties,
            });
        }

        let known_ids: BTreeSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();

        let mut relationships = Vec::new();
        for raw_rel in raw.relationships {
            let (Some(from), Some(to)) = (raw_rel.from, raw_rel.to) else {
                debug!("Dropping relationship without endpoints in chunk {}", chunk_id);
                continue;
            };

            relationships.push(ExtractedRelationship {
                from: resolve_endpoint(from, &known_ids, chunk_id),
                to: resolve_endpoint(to, &known_ids, chunk_id),
                rel_type: raw_rel.rel_type,
                properties: raw_rel.properties,
            });
        }

        if entities.is_empty() && relationships.is_empty() {
            warn!("Extraction produced nothing for chunk {}", chunk_id);
        } else {
            info!(
                "Extracted {} entities and {} relationships from chunk {}",
                entities.len(),
                relationships.len(),
                chunk_id
            );
        }

        (entities, relationships)
    }
}

/// Resolve a relationship endpoint against this call's namespaced entity
/// ids, assuming unmatched ids refer to an entity from the same chunk.
fn resolve_endpoint(endpoint: String, known_ids: &BTreeSet<&str>, chunk_id: &str) -> String {
    if known_ids.contains(endpoint.as_str()) {
        endpoint
    } else {
        format!("{chunk_id}_{endpoint}")
    }
}

/// Truncate at a char boundary, never mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::EntityKind;
    use vellum_llm::MockCompletionProvider;

    fn extractor_with_response(response: &str) -> (EntityExtractor, Arc<MockCompletionProvider>) {
        let provider = Arc::new(MockCompletionProvider::with_default_response(response));
        (EntityExtractor::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn entity_ids_are_namespaced_by_chunk() {
        let (extractor, _) = extractor_with_response(
            r#"{
                "entities": [
                    {"type": "Policy", "id": "policy_leave", "name": "Leave policy", "properties": {}}
                ],
                "relationships": []
            }"#,
        );

        let (entities, _) = extractor.extract("some text", "doc_x_chunk_0").await;

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "doc_x_chunk_0_policy_leave");
        assert_eq!(entities[0].kind, EntityKind::Policy);
        assert_eq!(entities[0].name, "Leave policy");
    }

    #[tokio::test]
    async fn local_endpoints_get_the_chunk_prefix() {
        let (extractor, _) = extractor_with_response(
            r#"{
                "entities": [
                    {"type": "Policy", "id": "policy_leave", "name": "Leave"},
                    {"type": "Topic", "id": "topic_family", "name": "Family"}
                ],
                "relationships": [
                    {"from": "policy_leave", "to": "topic_family", "type": "RELATES_TO"}
                ]
            }"#,
        );

        let (_, relationships) = extractor.extract("text", "h_chunk_3").await;

        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].from, "h_chunk_3_policy_leave");
        assert_eq!(relationships[0].to, "h_chunk_3_topic_family");
    }

    #[tokio::test]
    async fn already_namespaced_endpoints_are_kept() {
        let (extractor, _) = extractor_with_response(
            r#"{
                "entities": [
                    {"type": "Concept", "id": "c1", "name": "C"}
                ],
                "relationships": [
                    {"from": "h_chunk_0_c1", "to": "elsewhere", "type": "REFERENCES"}
                ]
            }"#,
        );

        let (_, relationships) = extractor.extract("text", "h_chunk_0").await;

        // "h_chunk_0_c1" matches the namespaced entity set and stays as-is;
        // "elsewhere" does not and gets the heuristic prefix
        assert_eq!(relationships[0].from, "h_chunk_0_c1");
        assert_eq!(relationships[0].to, "h_chunk_0_elsewhere");
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let (extractor, _) = extractor_with_response(
            "```json\n{\"entities\": [{\"type\": \"Topic\", \"id\": \"t\", \"name\": \"T\"}], \"relationships\": []}\n```",
        );

        let (entities, _) = extractor.extract("text", "c_chunk_0").await;
        assert_eq!(entities.len(), 1);
    }

    #[tokio::test]
    async fn non_json_response_yields_empty_results() {
        let (extractor, _) =
            extractor_with_response("I'm sorry, I can't produce JSON for that.");

        let (entities, relationships) = extractor.extract("text", "c_chunk_0").await;
        assert!(entities.is_empty());
        assert!(relationships.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_yields_empty_results() {
        let provider = Arc::new(MockCompletionProvider::new());
        provider.set_failure("timeout");
        let extractor = EntityExtractor::new(provider);

        let (entities, relationships) = extractor.extract("text", "c_chunk_0").await;
        assert!(entities.is_empty());
        assert!(relationships.is_empty());
    }

    #[tokio::test]
    async fn malformed_entries_are_dropped_individually() {
        let (extractor, _) = extractor_with_response(
            r#"{
                "entities": [
                    {"type": "Policy", "name": "No id"},
                    {"id": "no_type", "name": "No type"},
                    {"type": "Werewolf", "id": "w1", "name": "Unknown kind"},
                    {"type": "Concept", "id": "ok", "name": "Kept"}
                ],
                "relationships": [
                    {"from": "ok", "type": "DANGLING"},
                    {"from": "ok", "to": "ok", "type": "SELF"}
                ]
            }"#,
        );

        let (entities, relationships) = extractor.extract("text", "c_chunk_0").await;

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "c_chunk_0_ok");
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].rel_type, "SELF");
    }

    #[tokio::test]
    async fn long_input_is_truncated_before_the_call() {
        let (extractor, provider) = extractor_with_response("{}");

        let text = "~".repeat(10_000);
        let _ = extractor.extract(&text, "c_chunk_0").await;

        let prompt = provider.last_prompt().unwrap();
        // The prompt contains at most the truncation bound of chunk text
        let kept = prompt.chars().filter(|c| *c == '~').count();
        assert_eq!(kept, MAX_EXTRACTION_CHARS);
    }

    #[tokio::test]
    async fn multibyte_text_truncates_on_char_boundaries() {
        let (extractor, provider) = extractor_with_response("{}");

        let text = "é".repeat(5000);
        let _ = extractor.extract(&text, "c_chunk_0").await;

        let prompt = provider.last_prompt().unwrap();
        let e_count = prompt.chars().filter(|c| *c == 'é').count();
        assert_eq!(e_count, MAX_EXTRACTION_CHARS);
    }
}
