//! API error handling
//!
//! Maps the core error taxonomy onto HTTP status categories so operators
//! can tell a broken deployment (configuration) from a degraded third
//! party (upstream). Upstream and internal failures are logged with full
//! detail here and returned to the caller as generic messages.

use assure_core::AssureError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured error body returned to callers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    #[schema(example = "UPSTREAM_ERROR")]
    pub code: String,
    /// Human-readable message
    #[schema(example = "generation service unavailable")]
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Client input error; message is safe to echo
    BadRequest(String),
    /// Missing or mismatched shared secret
    Unauthorized,
    /// Required credential/config absent - a deployment defect
    ServerConfig,
    /// Vector index or generation API unreachable, erroring, or malformed
    Upstream(&'static str),
    /// External call exceeded its deadline
    Timeout(String),
    /// Unexpected internal error; detail stays in the logs
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("UNAUTHORIZED", "Invalid API key"),
            ),
            AppError::ServerConfig => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("CONFIG_ERROR", "Server configuration error"),
            ),
            AppError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("UPSTREAM_ERROR", msg),
            ),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, ApiError::new("TIMEOUT", msg)),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", "Internal server error"),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<AssureError> for AppError {
    fn from(err: AssureError) -> Self {
        match err {
            AssureError::Validation(msg) => AppError::BadRequest(msg),
            AssureError::Config(msg) => {
                tracing::error!(error = %msg, "configuration defect surfaced at request time");
                AppError::ServerConfig
            }
            AssureError::VectorStore(msg) => {
                tracing::error!(error = %msg, "vector index failure");
                AppError::Upstream("vector index unavailable")
            }
            AssureError::Generation(msg) => {
                tracing::error!(error = %msg, "generation API failure");
                AppError::Upstream("generation service unavailable")
            }
            AssureError::Timeout { stage, seconds } => {
                tracing::error!(stage, seconds, "external call timed out");
                AppError::Timeout(format!("{stage} timed out"))
            }
            AssureError::Other(err) => {
                tracing::error!(error = ?err, "unexpected internal error");
                AppError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_do_not_leak_detail() {
        let err: AppError = AssureError::Generation("connect error to 10.0.0.5:443".into()).into();

        match err {
            AppError::Upstream(msg) => {
                assert!(!msg.contains("10.0.0.5"));
                assert_eq!(msg, "generation service unavailable");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_message_is_preserved() {
        let err: AppError = AssureError::Validation("query cannot be empty".into()).into();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "query cannot be empty"));
    }

    #[test]
    fn test_timeout_maps_to_distinct_category() {
        let err: AppError = AssureError::Timeout {
            stage: "retrieval",
            seconds: 10,
        }
        .into();
        assert!(matches!(err, AppError::Timeout(msg) if msg == "retrieval timed out"));
    }
}
