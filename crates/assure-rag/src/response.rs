//! Response formatting
//!
//! Wraps the raw completion into the service response shape. The confidence
//! label is derived from the retrieval outcome only, so identical inputs
//! always yield identical answer, confidence, and sources; the timestamp is
//! the formatting time.

use assure_core::{AnalysisResponse, ComplianceChunk, Confidence};
use chrono::Utc;

/// Derive the confidence label from the retrieval outcome.
///
/// `chunks` is the set that actually entered the prompt, after the context
/// budget was applied.
///
/// `High`: the answer was grounded in at least one chunk.
/// `Medium`: a retriever ran but no chunk entered the prompt.
/// `Low`: no vector index is configured, model knowledge only.
pub fn derive_confidence(retrieval_enabled: bool, chunks: &[ComplianceChunk]) -> Confidence {
    if !retrieval_enabled {
        Confidence::Low
    } else if chunks.is_empty() {
        Confidence::Medium
    } else {
        Confidence::High
    }
}

/// Build the outbound response from the completion and retrieval state.
pub fn format_response(
    answer: &str,
    framework: &str,
    chunks: &[ComplianceChunk],
    provider: &str,
    retrieval_enabled: bool,
) -> AnalysisResponse {
    let mut sources = vec![provider.to_string(), format!("{framework} framework")];

    // One label per distinct source document, in rank order
    for chunk in chunks {
        let label = format!("doc:{}", chunk.source_id);
        if !sources.contains(&label) {
            sources.push(label);
        }
    }

    AnalysisResponse {
        answer: answer.trim().to_string(),
        confidence: derive_confidence(retrieval_enabled, chunks),
        sources,
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Tests
// ============================================================================
