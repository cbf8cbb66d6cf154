//! # Vellum Config
//!
//! Runtime configuration for the Vellum services, layered from (lowest to
//! highest precedence):
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`vellum.toml` or an explicit path)
//! 3. `VELLUM__`-prefixed environment variables (`VELLUM__NEO4J__URI`,
//!    `VELLUM__LLM__MODEL`, ...)
//! 4. the conventional `NEO4J_PASSWORD` / `OPENAI_API_KEY` variables as
//!    fallbacks for the two secrets
//!
//! Validation happens once, up front, so provider factories and store
//! constructors can assume a well-formed config.

mod provider;

pub use provider::LlmProvider;

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File/environment layering failed
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    /// Values are well-formed but unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Graph database connection
    pub neo4j: Neo4jConfig,
    /// Completion model settings
    pub llm: LlmConfig,
    /// Embedding model settings
    pub embedding: EmbeddingConfig,
    /// Vector store location
    pub vector: VectorConfig,
    /// HTTP server settings
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration with the standard layering.
    ///
    /// `path` forces a specific TOML file (and errors if it is missing);
    /// otherwise `vellum.toml` in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path.to_path_buf())),
            None => builder.add_source(config::File::with_name("vellum").required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix("VELLUM")
                .prefix_separator("__")
                .separator("__"),
        );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.apply_env_fallbacks();
        Ok(cfg)
    }

    /// Parse configuration from a TOML string (defaults still apply).
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(cfg)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neo4j.uri.is_empty() {
            return Err(ConfigError::Invalid("neo4j.uri must not be empty".into()));
        }
        if self.neo4j.password.is_empty() {
            return Err(ConfigError::Invalid(
                "neo4j.password must be set (or NEO4J_PASSWORD exported)".into(),
            ));
        }
        if self.llm.provider.requires_api_key() && self.llm.api_key.is_none() {
            return Err(ConfigError::Invalid(format!(
                "llm.api_key must be set for the {} provider (or OPENAI_API_KEY exported)",
                self.llm.provider
            )));
        }
        if self.embedding.provider.requires_api_key() && self.embedding.resolved_api_key(&self.llm).is_none() {
            return Err(ConfigError::Invalid(format!(
                "embedding.api_key must be set for the {} provider",
                self.embedding.provider
            )));
        }
        if self.vector.table.is_empty() {
            return Err(ConfigError::Invalid("vector.table must not be empty".into()));
        }
        Ok(())
    }

    fn apply_env_fallbacks(&mut self) {
        if self.neo4j.password.is_empty() {
            if let Ok(password) = env::var("NEO4J_PASSWORD") {
                self.neo4j.password = password;
            }
        }
        if self.llm.api_key.is_none() {
            if let Ok(key) = env::var("OPENAI_API_KEY") {
                self.llm.api_key = Some(key);
            }
        }
    }
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    /// Bolt URI
    pub uri: String,
    /// Database user
    pub user: String,
    /// Database password; defaults to the `NEO4J_PASSWORD` variable
    pub password: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
        }
    }
}

/// Completion model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider
    pub provider: LlmProvider,
    /// API endpoint; provider default when unset
    pub endpoint: Option<String>,
    /// Model name; provider default when unset
    pub model: Option<String>,
    /// API key for providers that need one
    pub api_key: Option<String>,
    /// Sampling temperature (0.0 keeps extraction deterministic)
    pub temperature: f32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            endpoint: None,
            model: None,
            api_key: None,
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Effective endpoint.
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }

    /// Effective chat model.
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_chat_model().to_string())
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub provider: LlmProvider,
    /// API endpoint; provider default when unset
    pub endpoint: Option<String>,
    /// Model name; provider default when unset
    pub model: Option<String>,
    /// API key; falls back to the completion key for the same provider
    pub api_key: Option<String>,
    /// Vector dimensions; model default when unset
    pub dimensions: Option<usize>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            endpoint: None,
            model: None,
            api_key: None,
            dimensions: None,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// Effective endpoint.
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }

    /// Effective embedding model.
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_embedding_model().to_string())
    }

    /// Effective vector dimensions for the configured model.
    pub fn dimensions(&self) -> usize {
        self.dimensions
            .unwrap_or_else(|| provider::expected_dimensions(self.provider, &self.model()))
    }

    /// API key, falling back to the completion-side key when the providers
    /// match.
    pub fn resolved_api_key(&self, llm: &LlmConfig) -> Option<String> {
        self.api_key.clone().or_else(|| {
            if self.provider == llm.provider {
                llm.api_key.clone()
            } else {
                None
            }
        })
    }
}

/// Vector store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// LanceDB database directory
    pub path: PathBuf,
    /// Table holding the chunk index
    pub table: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/lancedb"),
            table: "chunks".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Directory uploaded documents are saved to before ingestion
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("./uploads"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_except_secrets() {
        let cfg = Config::default();

        assert_eq!(cfg.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(cfg.neo4j.user, "neo4j");
        assert_eq!(cfg.llm.model(), "gpt-4o-mini");
        assert_eq!(cfg.embedding.model(), "text-embedding-3-small");
        assert_eq!(cfg.embedding.dimensions(), 1536);
        assert_eq!(cfg.server.port, 8000);

        // Secrets are not defaulted
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [neo4j]
            uri = "bolt://graph:7687"
            password = "s3cret"

            [llm]
            provider = "ollama"
            model = "llama3.2"

            [embedding]
            provider = "ollama"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(cfg.neo4j.uri, "bolt://graph:7687");
        assert_eq!(cfg.llm.provider, LlmProvider::Ollama);
        assert_eq!(cfg.llm.model(), "llama3.2");
        assert_eq!(cfg.llm.endpoint(), "http://localhost:11434");
        assert_eq!(cfg.embedding.model(), "nomic-embed-text");
        assert_eq!(cfg.embedding.dimensions(), 768);
        assert_eq!(cfg.server.port, 9000);

        // Ollama needs no API keys, so this config validates
        cfg.validate().unwrap();
    }

    #[test]
    fn openai_requires_api_key() {
        let cfg = Config::from_toml_str(
            r#"
            [neo4j]
            password = "pw"
            "#,
        )
        .unwrap();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn embedding_key_falls_back_to_llm_key() {
        let cfg = Config::from_toml_str(
            r#"
            [neo4j]
            password = "pw"

            [llm]
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        cfg.validate().unwrap();
        assert_eq!(
            cfg.embedding.resolved_api_key(&cfg.llm).as_deref(),
            Some("sk-test")
        );
    }

    #[test]
    fn explicit_dimensions_win() {
        let cfg = Config::from_toml_str(
            r#"
            [embedding]
            model = "text-embedding-3-large"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.embedding.dimensions(), 3072);

        let cfg = Config::from_toml_str(
            r#"
            [embedding]
            model = "text-embedding-3-large"
            dimensions = 256
            "#,
        )
        .unwrap();
        assert_eq!(cfg.embedding.dimensions(), 256);
    }
}
