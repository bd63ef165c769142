//! RAG analysis query handler

use crate::error::AppError;
use crate::state::AppState;
use assure_core::{AnalysisQuery, AnalysisResponse};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Query request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// The question or code to analyze
    #[schema(example = "Is this endpoint PCI compliant?")]
    pub query: String,

    /// Compliance framework scoping retrieval
    #[schema(example = "pci-dss")]
    pub compliance_framework: String,

    /// Optional code or free-text context
    #[serde(default)]
    pub code_context: Option<String>,

    /// Ask the model to include practical examples
    #[serde(default = "default_true")]
    #[schema(default = true)]
    pub include_examples: bool,
}

fn default_true() -> bool {
    true
}

/// Query response body
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    /// Generated answer
    #[schema(example = "The endpoint is missing TLS enforcement required by PCI DSS 4.2...")]
    pub answer: String,

    /// Confidence label derived from retrieval outcome
    #[schema(example = "High")]
    pub confidence: String,

    /// Ordered source labels
    pub sources: Vec<String>,

    /// Response formatting time, RFC 3339 UTC
    #[schema(example = "2025-03-14T09:26:53.589Z")]
    pub timestamp: String,
}

impl From<AnalysisResponse> for QueryResponse {
    fn from(response: AnalysisResponse) -> Self {
        Self {
            answer: response.answer,
            confidence: response.confidence.to_string(),
            sources: response.sources,
            timestamp: response
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Handle RAG analysis requests
#[utoipa::path(
    post,
    path = "/api/v1/rag/query",
    tag = "query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Analysis successful", body = QueryResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 502, description = "Upstream dependency failure", body = crate::error::ApiError),
        (status = 504, description = "Upstream call timed out", body = crate::error::ApiError)
    )
)]
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let mut query = AnalysisQuery::new(req.query, req.compliance_framework)
        .with_examples(req.include_examples);
    if let Some(context) = req.code_context {
        query = query.with_code_context(context);
    }

    // Client input errors surface here, before any external call
    query.validate()?;

    let response = state.pipeline.analyze(&query).await?;

    Ok((StatusCode::OK, Json(QueryResponse::from(response))))
}
