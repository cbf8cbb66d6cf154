//! Embedding provider abstraction
//!
//! A unified interface for generating text embeddings from multiple
//! providers. Used only by the vector store; nothing else in the system sees
//! raw vectors.

pub mod ollama;
pub mod openai;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAIEmbeddingProvider;

use std::sync::Arc;

use async_trait::async_trait;
use vellum_config::{Config, LlmProvider};

use crate::error::{EmbeddingError, EmbeddingResult};

/// A text embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embed a batch of texts, preserving order. The default implementation
    /// embeds sequentially; providers with a native batch API override it.
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Vector dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Model the provider embeds with.
    fn model_name(&self) -> &str;
}

/// Create an embedding provider from configuration.
pub fn create_embedding_provider(config: &Config) -> EmbeddingResult<Arc<dyn EmbeddingProvider>> {
    let embedding = &config.embedding;
    match embedding.provider {
        LlmProvider::OpenAI => {
            let api_key = embedding.resolved_api_key(&config.llm).ok_or_else(|| {
                EmbeddingError::ConfigError("OpenAI API key not set".to_string())
            })?;
            Ok(Arc::new(OpenAIEmbeddingProvider::new(
                api_key,
                Some(embedding.endpoint()),
                embedding.model(),
                embedding.dimensions(),
                embedding.timeout_secs,
            )))
        }
        LlmProvider::Ollama => Ok(Arc::new(OllamaEmbeddingProvider::new(
            embedding.endpoint(),
            embedding.model(),
            embedding.dimensions(),
            embedding.timeout_secs,
        ))),
    }
}

/// Create a mock embedding provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_mock_provider(dimensions: usize) -> Arc<dyn EmbeddingProvider> {
    Arc::new(mock::MockEmbeddingProvider::with_dimensions(dimensions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_requires_openai_key() {
        let config = Config::default();
        assert!(matches!(
            create_embedding_provider(&config),
            Err(EmbeddingError::ConfigError(_))
        ));
    }

    #[test]
    fn factory_reuses_completion_key() {
        let config =
            Config::from_toml_str("[llm]\napi_key = \"sk-shared\"\n").unwrap();
        let provider = create_embedding_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "text-embedding-3-small");
        assert_eq!(provider.dimensions(), 1536);
    }
}
