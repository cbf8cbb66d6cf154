//! Provider selection and per-provider defaults

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend serving completions and/or embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI API
    OpenAI,
    /// Ollama local/remote service
    Ollama,
}

impl Default for LlmProvider {
    fn default() -> Self {
        LlmProvider::OpenAI
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAI => f.write_str("openai"),
            LlmProvider::Ollama => f.write_str("ollama"),
        }
    }
}

impl LlmProvider {
    /// Default API endpoint.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::Ollama => "http://localhost:11434",
        }
    }

    /// Default chat/completion model.
    pub fn default_chat_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Ollama => "llama3.2",
        }
    }

    /// Default embedding model.
    pub fn default_embedding_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "text-embedding-3-small",
            LlmProvider::Ollama => "nomic-embed-text",
        }
    }

    /// Whether this provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        match self {
            LlmProvider::OpenAI => true,
            LlmProvider::Ollama => false,
        }
    }
}

/// Expected embedding dimensions for known models, with per-provider
/// fallbacks for unknown ones.
pub(crate) fn expected_dimensions(provider: LlmProvider, model: &str) -> usize {
    match (provider, model) {
        (LlmProvider::OpenAI, "text-embedding-3-small") => 1536,
        (LlmProvider::OpenAI, "text-embedding-3-large") => 3072,
        (LlmProvider::OpenAI, "text-embedding-ada-002") => 1536,
        (LlmProvider::Ollama, "nomic-embed-text") => 768,
        (LlmProvider::OpenAI, _) => 1536,
        (LlmProvider::Ollama, _) => 768,
    }
}
