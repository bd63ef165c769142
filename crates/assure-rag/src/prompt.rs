//! Prompt assembly
//!
//! The prompt is an explicit template: a fixed set of named sections
//! (role, grounding context, examples request) assembled in a fixed order,
//! each included or omitted on a boolean predicate. The no-context path is
//! deliberate, not a fallback: with zero retrieved chunks the grounding
//! section and its instruction are absent entirely.

use assure_core::{AnalysisQuery, ComplianceChunk, Prompt, RagConfig};

/// Separator between chunk texts inside the context section
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Assembles prompts from a query and its retrieved context
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_context_chars: usize,
}

impl PromptAssembler {
    pub fn new(config: &RagConfig) -> Self {
        Self {
            max_context_chars: config.max_context_chars,
        }
    }

    /// Build the prompt payload for the generation API.
    ///
    /// Chunks are admitted whole, in rank order, while the running total
    /// stays within the context budget; the rest are dropped entirely.
    /// Returns the admitted set alongside the prompt so that downstream
    /// confidence and source labels only reflect chunks the model saw.
    pub fn assemble(
        &self,
        query: &AnalysisQuery,
        chunks: &[ComplianceChunk],
    ) -> (Prompt, Vec<ComplianceChunk>) {
        let admitted = self.fit_context(chunks);

        let mut sections: Vec<String> = Vec::new();

        // Role section, always present, names the framework
        sections.push(format!(
            "You are the Assure Scanner Security & Compliance Engine.\n\
             Primary focus: {}\n\
             Task: Analyze the provided code or query for vulnerabilities, \
             regulatory gaps, and missing best practices. Respond concisely, \
             professionally, and with actionable recommendations.",
            query.framework
        ));

        // Grounding section, only when retrieval produced context
        if !admitted.is_empty() {
            let context_text = admitted
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR);

            sections.push(format!(
                "Compliance context:\n{context_text}\n\n\
                 Answer using only the compliance context above. If the context \
                 does not contain the answer, say that you do not know based on \
                 these documents."
            ));
        }

        // Examples section, on request
        if query.include_examples {
            sections.push("Include practical code examples.".to_string());
        }

        let mut user = query.query.clone();
        if let Some(code) = &query.code_context {
            if !code.trim().is_empty() {
                user.push_str("\n\nCode context:\n");
                user.push_str(code);
            }
        }

        let prompt = Prompt {
            system: sections.join("\n\n"),
            user,
        };

        (prompt, admitted)
    }

    /// Keep whole chunks in rank order within the character budget.
    fn fit_context(&self, chunks: &[ComplianceChunk]) -> Vec<ComplianceChunk> {
        let mut admitted = Vec::new();
        let mut total = 0usize;

        for chunk in chunks {
            if total + chunk.content.len() > self.max_context_chars {
                break;
            }
            total += chunk.content.len();
            admitted.push(chunk.clone());
        }

        let dropped = chunks.len() - admitted.len();
        if dropped > 0 {
            tracing::debug!(dropped, budget = self.max_context_chars, "context budget exceeded, dropped lowest-ranked chunks");
        }

        admitted
    }
}

// ============================================================================
// Tests
// ============================================================================
