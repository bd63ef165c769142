//! Assure Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the Assure RAG
//! service:
//! - Analysis query and response models
//! - Compliance chunk model (the unit of retrieval)
//! - Common error types
//! - Shared traits for retrieval and generation backends
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, AuthConfig, ConfigError, LlmConfig, LoggingConfig, RagConfig, ServerConfig,
    VectorConfig,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Assure operations
///
/// The variants map onto the service's error taxonomy: client input errors,
/// server configuration defects, upstream dependency failures (vector index
/// or generation API), timeouts, and everything else.
#[derive(Error, Debug)]
pub enum AssureError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector index error: {0}")]
    VectorStore(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssureError {
    /// True for failures of an external collaborator (vector index or
    /// generation API), as opposed to a broken deployment.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::VectorStore(_) | Self::Generation(_) | Self::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AssureError>;

// ============================================================================
// Query Model
// ============================================================================

/// An inbound analysis query. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisQuery {
    /// The user's question or code to analyze
    pub query: String,

    /// Compliance framework label scoping retrieval (e.g. "soc2", "pci-dss")
    pub framework: String,

    /// Optional caller-supplied code or context, merged into the user message
    pub code_context: Option<String>,

    /// Ask the model to include practical examples
    pub include_examples: bool,
}

impl AnalysisQuery {
    /// Create a query with defaults (examples included)
    pub fn new(query: impl Into<String>, framework: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            framework: framework.into(),
            code_context: None,
            include_examples: true,
        }
    }

    /// Attach caller-supplied code context
    pub fn with_code_context(mut self, context: impl Into<String>) -> Self {
        self.code_context = Some(context.into());
        self
    }

    /// Toggle the examples request
    pub fn with_examples(mut self, include: bool) -> Self {
        self.include_examples = include;
        self
    }

    /// Validate required fields. Runs before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(AssureError::Validation("query cannot be empty".into()));
        }
        if self.framework.trim().is_empty() {
            return Err(AssureError::Validation(
                "compliance_framework cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Chunk Model
// ============================================================================

/// A span of compliance documentation stored in the vector index.
///
/// Created at ingestion time; read-only at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceChunk {
    /// Text content
    pub content: String,

    /// Framework label this chunk was ingested under
    pub framework: String,

    /// Source document identifier
    pub source_id: String,

    /// Similarity score from retrieval (higher is more relevant)
    pub score: f32,
}

impl ComplianceChunk {
    pub fn new(
        content: impl Into<String>,
        framework: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            framework: framework.into(),
            source_id: source_id.into(),
            score: 0.0,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

// ============================================================================
// Prompt Model
// ============================================================================

/// A fully assembled prompt payload for the generation API.
///
/// Transient: one per request, discarded after generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System/instruction text
    pub system: String,

    /// User message text
    pub user: String,
}

// ============================================================================
// Response Model
// ============================================================================

/// Confidence label attached to an analysis response.
///
/// Derived deterministically from the retrieval outcome:
/// `High` when the answer was grounded in at least one retrieved chunk,
/// `Medium` when retrieval ran but matched nothing, and `Low` when no
/// vector index is configured at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// The service's outbound response shape. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Generated answer text
    pub answer: String,

    /// Confidence label
    pub confidence: Confidence,

    /// Ordered source labels: provider, framework, then per-chunk sources
    pub sources: Vec<String>,

    /// Time the response was formatted (UTC, RFC 3339 on the wire)
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for retrieval backends.
///
/// Implementations must honor the framework filter exactly: a returned
/// chunk's `framework` always equals the requested label, and the result
/// never exceeds `k` entries, ordered by descending similarity.
#[async_trait::async_trait]
pub trait ChunkRetriever: Send + Sync {
    /// Retrieve at most `k` chunks matching `framework`, most relevant first.
    ///
    /// Zero matches is an empty vec, not an error.
    async fn retrieve(
        &self,
        query_text: &str,
        framework: &str,
        k: usize,
    ) -> Result<Vec<ComplianceChunk>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Trait for generation clients
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send the assembled prompt and return the raw completion text
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Provider name used in response source labels
    fn provider(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_defaults() {
        let query = AnalysisQuery::new("Is this endpoint PCI compliant?", "pci-dss");

        assert!(query.include_examples);
        assert!(query.code_context.is_none());
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_query_validation_rejects_empty_fields() {
        let empty_query = AnalysisQuery::new("   ", "soc2");
        assert!(matches!(
            empty_query.validate(),
            Err(AssureError::Validation(_))
        ));

        let empty_framework = AnalysisQuery::new("What about MFA?", "");
        assert!(matches!(
            empty_framework.validate(),
            Err(AssureError::Validation(_))
        ));
    }

    #[test]
    fn test_chunk_builder() {
        let chunk = ComplianceChunk::new("Rule A text", "pci-dss", "pci_manual.pdf").with_score(0.91);

        assert_eq!(chunk.framework, "pci-dss");
        assert_eq!(chunk.source_id, "pci_manual.pdf");
        assert!((chunk.score - 0.91).abs() < f32::EPSILON);
    }

    #[test]
    fn test_confidence_display() {
        assert_eq!(Confidence::High.to_string(), "High");
        assert_eq!(Confidence::Medium.to_string(), "Medium");
        assert_eq!(Confidence::Low.to_string(), "Low");
    }

    #[test]
    fn test_error_upstream_classification() {
        assert!(AssureError::VectorStore("down".into()).is_upstream());
        assert!(AssureError::Generation("502".into()).is_upstream());
        assert!(AssureError::Timeout {
            stage: "generation",
            seconds: 60
        }
        .is_upstream());
        assert!(!AssureError::Config("missing key".into()).is_upstream());
        assert!(!AssureError::Validation("empty".into()).is_upstream());
    }

    #[test]
    fn test_response_timestamp_serializes_rfc3339_utc() {
        let response = AnalysisResponse {
            answer: "ok".into(),
            confidence: Confidence::High,
            sources: vec!["Anthropic Claude".into()],
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z') || ts.contains("+00:00"));
        assert_eq!(json["confidence"], "High");
    }
}
