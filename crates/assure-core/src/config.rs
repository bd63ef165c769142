//! Assure Configuration Management
//!
//! Configuration is constructed once at process startup (environment
//! variables, optionally seeded from a TOML file) and passed by reference
//! into the retriever and generation client constructors. Missing required
//! values fail at startup via [`AppConfig::validate`], never mid-request.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Shared-secret authentication
    pub auth: AuthConfig,

    /// Vector index configuration. `None` disables retrieval entirely;
    /// the service then answers from model knowledge alone.
    pub vector: Option<VectorConfig>,

    /// Generation API configuration
    pub llm: LlmConfig,

    /// RAG pipeline configuration
    pub rag: RagConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "API_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Shared secret for inbound requests
        if let Ok(key) = std::env::var("INTERNAL_API_KEY") {
            config.auth.internal_api_key = Some(key);
        }

        // Vector index (retrieval is optional; enabled when QDRANT_URL is set)
        if let Ok(url) = std::env::var("QDRANT_URL") {
            let mut vector = VectorConfig {
                qdrant_url: url,
                ..Default::default()
            };
            if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
                vector.collection = collection;
            }
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                vector.openai_api_key = Some(key);
            }
            if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
                vector.embedding_model = model;
            }
            config.vector = Some(vector);
        }

        // Generation API
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            config.llm.model = model;
        }
        if let Ok(tokens) = std::env::var("MAX_TOKENS") {
            config.llm.max_tokens = tokens.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MAX_TOKENS".to_string(),
                value: tokens,
            })?;
        }
        if let Ok(secs) = std::env::var("GENERATION_TIMEOUT_SECS") {
            config.llm.timeout_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "GENERATION_TIMEOUT_SECS".to_string(),
                value: secs,
            })?;
        }

        // RAG pipeline
        if let Ok(k) = std::env::var("RAG_TOP_K") {
            config.rag.top_k = k.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAG_TOP_K".to_string(),
                value: k,
            })?;
        }
        if let Ok(chars) = std::env::var("MAX_CONTEXT_CHARS") {
            config.rag.max_context_chars =
                chars.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MAX_CONTEXT_CHARS".to_string(),
                    value: chars,
                })?;
        }
        if let Ok(secs) = std::env::var("RETRIEVAL_TIMEOUT_SECS") {
            config.rag.retrieval_timeout_secs =
                secs.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "RETRIEVAL_TIMEOUT_SECS".to_string(),
                    value: secs,
                })?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Check that every required value is present. Called once at startup
    /// so that a broken deployment fails before serving traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.internal_api_key.is_none() {
            return Err(ConfigError::MissingRequired("INTERNAL_API_KEY".into()));
        }
        if self.llm.api_key.is_none() {
            return Err(ConfigError::MissingRequired("ANTHROPIC_API_KEY".into()));
        }
        if let Some(vector) = &self.vector {
            if vector.openai_api_key.is_none() {
                return Err(ConfigError::MissingRequired("OPENAI_API_KEY".into()));
            }
            if vector.collection.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "QDRANT_COLLECTION".into(),
                    value: vector.collection.clone(),
                });
            }
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RAG_TOP_K".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Shared-secret authentication for inbound requests
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected value of the X-Internal-API-Key header. Absence is a
    /// deployment defect, surfaced as a server configuration error.
    pub internal_api_key: Option<String>,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant collection name
    pub collection: String,

    /// OpenAI API key for query embeddings (required when retrieval is on)
    pub openai_api_key: Option<String>,

    /// Embedding model name. Must match the model used at ingestion time.
    pub embedding_model: String,

    /// Vector dimension (must match embedding model)
    pub dimension: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "compliance_frameworks".to_string(),
            openai_api_key: None,
            embedding_model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

/// Generation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Anthropic API key
    pub api_key: Option<String>,

    /// API base URL (overridable for compatible gateways)
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Token ceiling for completions
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Number of chunks to retrieve per query
    pub top_k: usize,

    /// Maximum retrieved context length (characters). Chunks beyond the
    /// budget are dropped whole, lowest-ranked first.
    pub max_context_chars: usize,

    /// Retrieval timeout in seconds
    pub retrieval_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_context_chars: 8000,
            retrieval_timeout_secs: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.rag.top_k, 3);
        assert!(config.vector.is_none());
        assert_eq!(config.llm.model, "claude-3-5-sonnet-20240620");
    }

    #[test]
    fn test_validate_requires_shared_secret() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-ant-test".into());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "INTERNAL_API_KEY"));
    }

    #[test]
    fn test_validate_requires_generation_key() {
        let mut config = AppConfig::default();
        config.auth.internal_api_key = Some("secret".into());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_validate_requires_embedding_key_when_retrieval_enabled() {
        let mut config = AppConfig::default();
        config.auth.internal_api_key = Some("secret".into());
        config.llm.api_key = Some("sk-ant-test".into());
        config.vector = Some(VectorConfig::default());

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "OPENAI_API_KEY"));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let mut config = AppConfig::default();
        config.auth.internal_api_key = Some("secret".into());
        config.llm.api_key = Some("sk-ant-test".into());
        config.vector = Some(VectorConfig {
            openai_api_key: Some("sk-test".into()),
            ..Default::default()
        });

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.auth.internal_api_key = Some("secret".into());
        config.llm.api_key = Some("sk-ant-test".into());
        config.rag.top_k = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            [server]
            port = 9000

            [rag]
            top_k = 5
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.rag.max_context_chars, 8000);
    }
}
