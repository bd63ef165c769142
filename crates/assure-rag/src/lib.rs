//! Assure RAG - The retrieval-augmented analysis pipeline
//!
//! Sequences one query through its stages: retrieve framework-scoped
//! chunks from the vector index (when one is configured), assemble the
//! prompt, call the generation API, and format the response. Each stage's
//! external call runs under its own deadline; expiry is a distinct timeout
//! error, never a hang.

use assure_core::{
    AnalysisQuery, AnalysisResponse, AssureError, ChunkRetriever, ComplianceChunk,
    GenerationClient, LlmConfig, RagConfig, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub mod llm;
pub mod prompt;
pub mod response;

pub use llm::AnthropicClient;
pub use prompt::PromptAssembler;
pub use response::{derive_confidence, format_response};

/// The per-request analysis pipeline. Stateless across queries; safe to
/// share behind an `Arc`.
pub struct AnalysisPipeline {
    retriever: Option<Arc<dyn ChunkRetriever>>,
    generator: Arc<dyn GenerationClient>,
    assembler: PromptAssembler,
    top_k: usize,
    retrieval_timeout: Duration,
    generation_timeout: Duration,
}

impl AnalysisPipeline {
    /// Create a pipeline. `retriever` is `None` when no vector index is
    /// configured; the service then answers from model knowledge alone.
    pub fn new(
        retriever: Option<Arc<dyn ChunkRetriever>>,
        generator: Arc<dyn GenerationClient>,
        rag_config: &RagConfig,
        llm_config: &LlmConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            assembler: PromptAssembler::new(rag_config),
            top_k: rag_config.top_k,
            retrieval_timeout: Duration::from_secs(rag_config.retrieval_timeout_secs),
            generation_timeout: Duration::from_secs(llm_config.timeout_secs),
        }
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.retriever.is_some()
    }

    /// Execute one analysis query end to end.
    pub async fn analyze(&self, query: &AnalysisQuery) -> Result<AnalysisResponse> {
        query.validate()?;

        tracing::info!(framework = %query.framework, "analysis query started");

        let retrieved = self.retrieve_context(query).await?;
        tracing::debug!(count = retrieved.len(), "retrieval completed");

        // Confidence and sources are derived from the admitted set, so a
        // chunk dropped by the context budget never counts as grounding
        let (prompt, chunks) = self.assembler.assemble(query, &retrieved);
        tracing::debug!(
            system_chars = prompt.system.len(),
            user_chars = prompt.user.len(),
            admitted = chunks.len(),
            "prompt assembled"
        );

        let answer = timeout(self.generation_timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| AssureError::Timeout {
                stage: "generation",
                seconds: self.generation_timeout.as_secs(),
            })??;
        tracing::info!(answer_chars = answer.len(), "generation completed");

        Ok(format_response(
            &answer,
            &query.framework,
            &chunks,
            self.generator.provider(),
            self.retrieval_enabled(),
        ))
    }

    async fn retrieve_context(&self, query: &AnalysisQuery) -> Result<Vec<ComplianceChunk>> {
        let Some(retriever) = &self.retriever else {
            return Ok(Vec::new());
        };

        timeout(
            self.retrieval_timeout,
            retriever.retrieve(&query.query, &query.framework, self.top_k),
        )
        .await
        .map_err(|_| AssureError::Timeout {
            stage: "retrieval",
            seconds: self.retrieval_timeout.as_secs(),
        })?
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assure_core::{Confidence, Prompt};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedRetriever {
        chunks: Vec<ComplianceChunk>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl FixedRetriever {
        fn returning(chunks: Vec<ComplianceChunk>) -> Self {
            Self {
                chunks,
                fail: false,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl ChunkRetriever for FixedRetriever {
        async fn retrieve(
            &self,
            _query_text: &str,
            framework: &str,
            k: usize,
        ) -> Result<Vec<ComplianceChunk>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AssureError::VectorStore("connection refused".into()));
            }
            Ok(self
                .chunks
                .iter()
                .filter(|c| c.framework == framework)
                .take(k)
                .cloned()
                .collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct RecordingGenerator {
        calls: AtomicUsize,
        last_prompt: Mutex<Option<Prompt>>,
        answer: Result<String>,
        delay: Option<Duration>,
    }

    impl RecordingGenerator {
        fn answering(answer: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                answer: Ok(answer.to_string()),
                delay: None,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
                answer: Err(AssureError::Generation("upstream 529".into())),
                delay: None,
            }
        }

        fn slow(answer: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::answering(answer)
            }
        }
    }

    #[async_trait]
    impl GenerationClient for RecordingGenerator {
        async fn generate(&self, prompt: &Prompt) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(AssureError::Generation(msg)) => Err(AssureError::Generation(msg.clone())),
                Err(_) => unreachable!(),
            }
        }

        fn provider(&self) -> &str {
            "Anthropic Claude"
        }
    }

    fn pci_chunks() -> Vec<ComplianceChunk> {
        vec![
            ComplianceChunk::new("Rule A text", "pci-dss", "pci_manual.pdf").with_score(0.9),
            ComplianceChunk::new("Rule B text", "pci-dss", "pci_manual.pdf").with_score(0.8),
        ]
    }

    fn pipeline(
        retriever: Option<Arc<dyn ChunkRetriever>>,
        generator: Arc<RecordingGenerator>,
    ) -> AnalysisPipeline {
        AnalysisPipeline::new(
            retriever,
            generator,
            &RagConfig::default(),
            &LlmConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_grounded_query_flows_chunks_into_prompt() {
        let generator = Arc::new(RecordingGenerator::answering("Use TLS."));
        let retriever = Arc::new(FixedRetriever::returning(pci_chunks()));
        let pipeline = pipeline(Some(retriever), generator.clone());

        let query = AnalysisQuery::new("Is this endpoint PCI compliant?", "pci-dss");
        let response = pipeline.analyze(&query).await.unwrap();

        assert_eq!(response.answer, "Use TLS.");
        assert_eq!(response.confidence, Confidence::High);
        assert!(response.sources.contains(&"doc:pci_manual.pdf".to_string()));

        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.system.contains("Rule A text"));
        assert!(prompt.system.contains("Rule B text"));
        assert!(prompt.system.contains("pci-dss"));
    }

    #[tokio::test]
    async fn test_no_retriever_means_ungrounded_prompt_and_low_confidence() {
        let generator = Arc::new(RecordingGenerator::answering("General guidance."));
        let pipeline = pipeline(None, generator.clone());

        let query = AnalysisQuery::new("What does SOC 2 require for MFA?", "soc2");
        let response = pipeline.analyze(&query).await.unwrap();

        assert_eq!(response.confidence, Confidence::Low);
        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(!prompt.system.contains("Compliance context:"));
    }

    #[tokio::test]
    async fn test_zero_matches_yields_medium_confidence() {
        let generator = Arc::new(RecordingGenerator::answering("General guidance."));
        let retriever = Arc::new(FixedRetriever::returning(pci_chunks()));
        let pipeline = pipeline(Some(retriever), generator.clone());

        let query = AnalysisQuery::new("Data retention rules?", "hipaa");
        let response = pipeline.analyze(&query).await.unwrap();

        assert_eq!(response.confidence, Confidence::Medium);
        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(!prompt.system.contains("Compliance context:"));
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_generator() {
        let generator = Arc::new(RecordingGenerator::answering("unused"));
        let pipeline = pipeline(None, generator.clone());

        let query = AnalysisQuery::new("  ", "soc2");
        let err = pipeline.analyze(&query).await.unwrap_err();

        assert!(matches!(err, AssureError::Validation(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retriever_failure_is_upstream_and_skips_generation() {
        let generator = Arc::new(RecordingGenerator::answering("unused"));
        let retriever = Arc::new(FixedRetriever {
            chunks: vec![],
            fail: true,
            delay: None,
        });
        let pipeline = pipeline(Some(retriever), generator.clone());

        let query = AnalysisQuery::new("q", "soc2");
        let err = pipeline.analyze(&query).await.unwrap_err();

        assert!(matches!(err, AssureError::VectorStore(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates_as_upstream() {
        let generator = Arc::new(RecordingGenerator::failing());
        let pipeline = pipeline(None, generator);

        let query = AnalysisQuery::new("q", "soc2");
        let err = pipeline.analyze(&query).await.unwrap_err();

        assert!(err.is_upstream());
        assert!(matches!(err, AssureError::Generation(_)));
    }

    #[tokio::test]
    async fn test_budget_dropped_chunks_do_not_claim_grounding() {
        let generator = Arc::new(RecordingGenerator::answering("General guidance."));
        let retriever = Arc::new(FixedRetriever::returning(pci_chunks()));
        // Budget smaller than any chunk: retrieval succeeds, nothing admitted
        let rag_config = RagConfig {
            max_context_chars: 3,
            ..Default::default()
        };
        let pipeline = AnalysisPipeline::new(
            Some(retriever),
            generator.clone(),
            &rag_config,
            &LlmConfig::default(),
        );

        let query = AnalysisQuery::new("Is this endpoint PCI compliant?", "pci-dss");
        let response = pipeline.analyze(&query).await.unwrap();

        assert_eq!(response.confidence, Confidence::Medium);
        assert!(!response.sources.iter().any(|s| s.starts_with("doc:")));

        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(!prompt.system.contains("Compliance context:"));
    }

    #[tokio::test]
    async fn test_retrieval_deadline_yields_timeout_and_skips_generation() {
        let generator = Arc::new(RecordingGenerator::answering("unused"));
        let retriever = Arc::new(FixedRetriever {
            chunks: pci_chunks(),
            fail: false,
            delay: Some(Duration::from_millis(200)),
        });
        let rag_config = RagConfig {
            retrieval_timeout_secs: 0,
            ..Default::default()
        };
        let pipeline = AnalysisPipeline::new(
            Some(retriever),
            generator.clone(),
            &rag_config,
            &LlmConfig::default(),
        );

        let query = AnalysisQuery::new("q", "pci-dss");
        let err = pipeline.analyze(&query).await.unwrap_err();

        assert!(matches!(
            err,
            AssureError::Timeout {
                stage: "retrieval",
                ..
            }
        ));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_deadline_yields_timeout_error() {
        let generator = Arc::new(RecordingGenerator::slow(
            "late",
            Duration::from_millis(200),
        ));
        let llm_config = LlmConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        let pipeline = AnalysisPipeline::new(
            None,
            generator,
            &RagConfig::default(),
            &llm_config,
        );

        let query = AnalysisQuery::new("q", "soc2");
        let err = pipeline.analyze(&query).await.unwrap_err();

        assert!(matches!(
            err,
            AssureError::Timeout {
                stage: "generation",
                ..
            }
        ));
    }
}
