//! Completion provider abstraction
//!
//! One prompt in, one text out. Streaming, tool use and chat history are
//! deliberately out of scope: extraction and synthesis each make a single
//! self-contained call.

pub mod ollama;
pub mod openai;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use ollama::OllamaChatProvider;
pub use openai::OpenAIChatProvider;

use std::sync::Arc;

use async_trait::async_trait;
use vellum_config::{Config, LlmProvider};

use crate::error::{LlmError, LlmResult};

/// A text completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Submit one prompt, get the completion text back. May fail or time
    /// out; every call site handles both.
    async fn complete(&self, prompt: &str) -> LlmResult<String>;

    /// Human-readable provider name.
    fn provider_name(&self) -> &str;

    /// Model the provider completes with.
    fn model_name(&self) -> &str;

    /// Whether the backing service is reachable.
    async fn health_check(&self) -> LlmResult<bool>;
}

/// Create a completion provider from configuration.
pub fn create_completion_provider(config: &Config) -> LlmResult<Arc<dyn CompletionProvider>> {
    let llm = &config.llm;
    match llm.provider {
        LlmProvider::OpenAI => {
            let api_key = llm
                .api_key
                .clone()
                .ok_or_else(|| LlmError::ConfigError("OpenAI API key not set".to_string()))?;
            Ok(Arc::new(OpenAIChatProvider::new(
                api_key,
                Some(llm.endpoint()),
                llm.model(),
                llm.temperature,
                llm.timeout_secs,
            )))
        }
        LlmProvider::Ollama => Ok(Arc::new(OllamaChatProvider::new(
            llm.endpoint(),
            llm.model(),
            llm.temperature,
            llm.timeout_secs,
        ))),
    }
}
