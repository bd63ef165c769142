//! Qdrant implementation of chunk retrieval
//!
//! Searches the collection written by the ingestion tool. The framework
//! filter is part of the search request itself, so the store guarantees
//! that no chunk from another framework can appear in a result.

use crate::embedding::EmbeddingClient;
use assure_core::{AssureError, ChunkRetriever, ComplianceChunk, Result, VectorConfig};
use async_trait::async_trait;
use qdrant_client::qdrant::{value::Kind, Condition, Filter, SearchPointsBuilder, Value};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;

/// Qdrant-backed retriever
pub struct QdrantRetriever {
    client: Qdrant,
    collection: String,
    embedder: Arc<dyn EmbeddingClient>,
}

impl QdrantRetriever {
    /// Create a new Qdrant connection from config
    pub fn new(config: &VectorConfig, embedder: Arc<dyn EmbeddingClient>) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| AssureError::VectorStore(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedder,
        })
    }
}

/// Build the mandatory framework filter for a search request
fn framework_filter(framework: &str) -> Filter {
    Filter::must([Condition::matches("framework", framework.to_string())])
}

/// Map a Qdrant payload back to a chunk. Points with a missing or empty
/// content field are skipped rather than surfaced as empty context.
fn chunk_from_payload(payload: &HashMap<String, Value>, score: f32) -> Option<ComplianceChunk> {
    let as_string = |key: &str| -> Option<String> {
        payload.get(key).and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
    };

    let content = as_string("content")?;
    if content.trim().is_empty() {
        return None;
    }

    let framework = as_string("framework")?;
    let source_id = as_string("source_id").unwrap_or_else(|| "unknown".to_string());

    Some(ComplianceChunk {
        content,
        framework,
        source_id,
        score,
    })
}

#[async_trait]
impl ChunkRetriever for QdrantRetriever {
    async fn retrieve(
        &self,
        query_text: &str,
        framework: &str,
        k: usize,
    ) -> Result<Vec<ComplianceChunk>> {
        let framework = framework.trim();
        if framework.is_empty() {
            return Err(AssureError::Validation(
                "framework label cannot be empty".to_string(),
            ));
        }

        let query_vector = self.embedder.embed(query_text).await?;

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector, k as u64)
                    .filter(framework_filter(framework))
                    .with_payload(true),
            )
            .await
            .map_err(|e| AssureError::VectorStore(format!("vector search failed: {e}")))?;

        // Qdrant returns results by descending similarity already
        let chunks: Vec<ComplianceChunk> = results
            .result
            .into_iter()
            .filter_map(|point| chunk_from_payload(&point.payload, point.score))
            .collect();

        tracing::debug!(
            framework,
            count = chunks.len(),
            "vector search returned chunks"
        );

        Ok(chunks)
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

// ============================================================================
// Tests
// ============================================================================
