//! In-memory retriever
//!
//! Honors the same contract as the Qdrant retriever: exact framework
//! filtering, descending score order, at most `k` results. Used by tests
//! and for running the service without a vector index.

use assure_core::{AssureError, ChunkRetriever, ComplianceChunk, Result};
use async_trait::async_trait;

/// Retriever over a fixed set of chunks
#[derive(Debug, Default)]
pub struct InMemoryRetriever {
    chunks: Vec<ComplianceChunk>,
}

impl InMemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<ComplianceChunk>) -> Self {
        Self { chunks }
    }

    pub fn push(&mut self, chunk: ComplianceChunk) {
        self.chunks.push(chunk);
    }
}

#[async_trait]
impl ChunkRetriever for InMemoryRetriever {
    async fn retrieve(
        &self,
        _query_text: &str,
        framework: &str,
        k: usize,
    ) -> Result<Vec<ComplianceChunk>> {
        let framework = framework.trim();
        if framework.is_empty() {
            return Err(AssureError::Validation(
                "framework label cannot be empty".to_string(),
            ));
        }

        let mut matched: Vec<ComplianceChunk> = self
            .chunks
            .iter()
            .filter(|c| c.framework == framework)
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.score.total_cmp(&a.score));
        matched.truncate(k);

        Ok(matched)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> InMemoryRetriever {
        InMemoryRetriever::with_chunks(vec![
            ComplianceChunk::new("Rule A text", "pci-dss", "pci_manual.pdf").with_score(0.91),
            ComplianceChunk::new("Rule B text", "pci-dss", "pci_manual.pdf").with_score(0.85),
            ComplianceChunk::new("Rule C text", "pci-dss", "pci_addendum.pdf").with_score(0.72),
            ComplianceChunk::new("Rule D text", "pci-dss", "pci_addendum.pdf").with_score(0.64),
            ComplianceChunk::new("Trust criteria", "soc2", "soc2_manual.pdf").with_score(0.95),
        ])
    }

    #[tokio::test]
    async fn test_filter_is_exact() {
        let retriever = sample_index();

        let chunks = retriever.retrieve("mfa controls", "soc2", 10).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks.iter().all(|c| c.framework == "soc2"));
    }

    #[tokio::test]
    async fn test_result_never_exceeds_k() {
        let retriever = sample_index();

        let chunks = retriever
            .retrieve("cardholder data", "pci-dss", 3)
            .await
            .unwrap();

        assert_eq!(chunks.len(), 3);
        // Most relevant first
        assert_eq!(chunks[0].content, "Rule A text");
        assert!(chunks[0].score >= chunks[1].score);
        assert!(chunks[1].score >= chunks[2].score);
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let retriever = sample_index();

        let chunks = retriever
            .retrieve("data residency", "hipaa", 3)
            .await
            .unwrap();

        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_empty_framework_is_validation_error() {
        let retriever = sample_index();

        let err = retriever.retrieve("anything", "  ", 3).await.unwrap_err();
        assert!(matches!(err, AssureError::Validation(_)));
    }
}
