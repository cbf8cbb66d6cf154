//! Answer synthesis over retrieved context

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use vellum_core::{ContextItem, QueryOutcome, RetrievalInfo, SourceCitation};
use vellum_llm::CompletionProvider;

use crate::retriever::HybridRetriever;

/// Cap on rendered text per context item.
const CONTEXT_TEXT_CAP: usize = 500;

/// Answer returned without an LLM call when retrieval produced nothing.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information in the documents to answer this question.";

const QUERY_PROMPT: &str = r#"You are a helpful research assistant that answers questions using provided document context.

Your task:
1. Answer the question using the provided context
2. Explain your reasoning briefly
3. Cite which document sections were used

Context from documents:
{context}

User question: {query}

Provide a comprehensive answer that:
- Directly addresses the question
- Explains the reasoning (2-3 sentences)
- Cites specific document sections/filenames used

Answer:"#;

/// Synthesizes answers from hybrid-retrieved context.
pub struct QueryEngine {
    retriever: HybridRetriever,
    provider: Arc<dyn CompletionProvider>,
}

impl QueryEngine {
    /// Create an engine over a retriever and a completion provider.
    pub fn new(retriever: HybridRetriever, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    /// Answer `query` using hybrid retrieval.
    ///
    /// Always returns a well-formed outcome: any retrieval or synthesis
    /// failure is reported inside the answer string with empty sources, so
    /// transport callers never have to handle an error shape.
    pub async fn query(&self, query: &str, top_k: usize, max_hops: u32) -> QueryOutcome {
        match self.try_query(query, top_k, max_hops).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error processing query: {:#}", e);
                QueryOutcome {
                    answer: format!("Error processing query: {e:#}"),
                    sources: Vec::new(),
                    retrieval_info: RetrievalInfo::default(),
                }
            }
        }
    }

    async fn try_query(&self, query: &str, top_k: usize, max_hops: u32) -> Result<QueryOutcome> {
        info!("Processing query: {}", query);

        let retrieval = self
            .retriever
            .retrieve(query, top_k, max_hops)
            .await
            .context("Retrieval failed")?;

        let retrieval_info = RetrievalInfo {
            vector_results_count: retrieval.vector_results.len(),
            graph_context_count: retrieval.graph_context.len(),
            total_context_items: retrieval.combined_context.len(),
        };

        if retrieval.combined_context.is_empty() {
            return Ok(QueryOutcome {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
                retrieval_info,
            });
        }

        let formatted = format_context(&retrieval.combined_context);
        let prompt = QUERY_PROMPT
            .replacen("{context}", &formatted, 1)
            .replacen("{query}", query, 1);

        info!("Generating answer with LLM...");
        let answer = self
            .provider
            .complete(&prompt)
            .await
            .context("Answer synthesis failed")?;

        let sources = extract_sources(&retrieval.combined_context);
        info!("Generated answer with {} sources", sources.len());

        Ok(QueryOutcome {
            answer: answer.trim().to_string(),
            sources,
            retrieval_info,
        })
    }
}

/// Filename an item resolves to, if any.
fn item_filename(item: &ContextItem) -> Option<String> {
    item.metadata
        .get("filename")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| item.document_filename.clone())
}

/// Render context items into numbered prompt blocks.
fn format_context(combined_context: &[ContextItem]) -> String {
    let mut parts = Vec::new();

    for (idx, item) in combined_context.iter().enumerate() {
        let number = idx + 1;
        let filename = item_filename(item).unwrap_or_else(|| "Unknown".to_string());

        if !item.text.is_empty() {
            parts.push(format!(
                "[Source {number}] From: {filename}\nRetrieval method: {source}\nContent: {text}...\n",
                source = item.source,
                text = truncate_chars(&item.text, CONTEXT_TEXT_CAP),
            ));
        } else if let Some(name) = item.name.as_deref().filter(|n| !n.is_empty()) {
            let kind = item.entity_kind.as_deref().unwrap_or("Entity");
            parts.push(format!(
                "[Source {number}] Entity: {kind} - {name}\nRetrieval method: {source}\n",
                source = item.source,
            ));
        }
    }

    parts.join("\n")
}

/// Distinct source filenames in first-seen order, excluding unresolved ones.
fn extract_sources(combined_context: &[ContextItem]) -> Vec<SourceCitation> {
    let mut seen = std::collections::BTreeSet::new();
    let mut sources = Vec::new();

    for item in combined_context {
        let Some(filename) = item_filename(item) else {
            continue;
        };
        if filename == "Unknown" || !seen.insert(filename.clone()) {
            continue;
        }
        sources.push(SourceCitation {
            filename,
            source_type: item.source,
            chunk_index: item.metadata.get("chunk_index").and_then(|v| v.as_i64()),
        });
    }

    sources
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
    use serde_json::json;
    use std::sync::Arc;
    use vellum_core::test_support::{MockGraphStore, MockVectorIndex};
    use vellum_core::{Chunk, ContextSource, GraphStore, JsonMap, VectorIndex};
    use vellum_llm::MockCompletionProvider;

    fn item(source: ContextSource, text: &str, filename: Option<&str>) -> ContextItem {
        let mut metadata = JsonMap::new();
        if let Some(f) = filename {
            metadata.insert("filename".into(), json!(f));
        }
        ContextItem {
            source,
            text: text.into(),
            metadata,
            score: None,
            entity_kind: None,
            name: None,
            document_filename: None,
        }
    }

    fn engine(
        completion: Arc<MockCompletionProvider>,
    ) -> (QueryEngine, Arc<MockVectorIndex>, Arc<MockGraphStore>) {
        let vector = Arc::new(MockVectorIndex::new());
        let graph = Arc::new(MockGraphStore::new());
        let retriever = HybridRetriever::new(vector.clone(), graph.clone());
        (QueryEngine::new(retriever, completion), vector, graph)
    }

    #[test]
    fn context_blocks_are_numbered_and_capped() {
        let long_text = "z".repeat(800);
        let items = vec![
            item(ContextSource::Vector, &long_text, Some("a.txt")),
            item(ContextSource::Graph, "short", Some("b.txt")),
        ];

        let formatted = format_context(&items);

        assert!(formatted.contains("[Source 1] From: a.txt"));
        assert!(formatted.contains("[Source 2] From: b.txt"));
        assert!(formatted.contains("Retrieval method: vector"));
        assert!(formatted.contains("Retrieval method: graph"));

        // Text capped at 500 chars
        let rendered = formatted.chars().filter(|c| *c == 'z').count();
        assert_eq!(rendered, CONTEXT_TEXT_CAP);
    }

    #[test]
    fn entities_without_text_render_as_kind_and_name() {
        let mut entity = item(ContextSource::GraphEntity, "", None);
        entity.entity_kind = Some("Policy".into());
        entity.name = Some("Leave policy".into());

        let formatted = format_context(&[entity]);
        assert!(formatted.contains("Entity: Policy - Leave policy"));
        assert!(formatted.contains("Retrieval method: graph_entity"));
    }

    #[test]
    fn sources_are_distinct_first_seen_and_resolved() {
        let items = vec![
            item(ContextSource::Vector, "t1", Some("a.txt")),
            item(ContextSource::Vector, "t2", Some("b.txt")),
            item(ContextSource::Graph, "t3", Some("a.txt")),
            item(ContextSource::GraphEntity, "", None),
        ];

        let sources = extract_sources(&items);

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].filename, "a.txt");
        assert_eq!(sources[0].source_type, ContextSource::Vector);
        assert_eq!(sources[1].filename, "b.txt");
    }

    #[tokio::test]
    async fn empty_context_answers_without_an_llm_call() {
        let completion = Arc::new(MockCompletionProvider::new());
        let (engine, _, _) = engine(completion.clone());

        let outcome = engine.query("anything", 5, 2).await;

        assert_eq!(outcome.answer, NO_CONTEXT_ANSWER);
        assert!(outcome.sources.is_empty());
        assert_eq!(outcome.retrieval_info.total_context_items, 0);
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_becomes_an_answer_string() {
        let completion = Arc::new(MockCompletionProvider::new());
        completion.set_failure("model exploded");
        let (engine, vector, graph) = engine(completion);

        graph
            .upsert_document("doc_a", "a.txt", &JsonMap::new())
            .await
            .unwrap();
        let mut metadata = JsonMap::new();
        metadata.insert("chunk_id".into(), json!("a_chunk_0"));
        metadata.insert("filename".into(), json!("a.txt"));
        let chunk = Chunk {
            id: "a_chunk_0".into(),
            text: "relevant words".into(),
            index: 0,
            metadata,
        };
        graph.upsert_chunk(&chunk, "doc_a").await.unwrap();
        vector.index(&[chunk]).await.unwrap();

        let outcome = engine.query("relevant words", 5, 2).await;

        assert!(outcome.answer.starts_with("Error processing query:"));
        assert!(outcome.answer.contains("model exploded"));
        assert!(outcome.sources.is_empty());
    }

    #[tokio::test]
    async fn answer_includes_sources_and_counts() {
        let completion = Arc::new(MockCompletionProvider::with_default_response(
            "The policy grants twelve weeks. [a.txt]",
        ));
        let (engine, vector, graph) = engine(completion.clone());

        graph
            .upsert_document("doc_a", "a.txt", &JsonMap::new())
            .await
            .unwrap();
        let mut metadata = JsonMap::new();
        metadata.insert("chunk_id".into(), json!("a_chunk_0"));
        metadata.insert("filename".into(), json!("a.txt"));
        metadata.insert("chunk_index".into(), json!(0));
        let chunk = Chunk {
            id: "a_chunk_0".into(),
            text: "maternity leave policy details".into(),
            index: 0,
            metadata,
        };
        graph.upsert_chunk(&chunk, "doc_a").await.unwrap();
        vector.index(&[chunk]).await.unwrap();

        let outcome = engine.query("maternity leave", 5, 2).await;

        assert!(outcome.answer.contains("twelve weeks"));
        assert_eq!(outcome.sources.len(), 1);
        assert_eq!(outcome.sources[0].filename, "a.txt");
        assert_eq!(outcome.retrieval_info.vector_results_count, 1);
        assert!(outcome.retrieval_info.total_context_items >= 1);

        // The synthesis prompt embedded the retrieved context and the query
        let prompt = completion.last_prompt().unwrap();
        assert!(prompt.contains("maternity leave policy details"));
        assert!(prompt.contains("User question: maternity leave"));
    }
}
