//! Shared-secret authentication for inbound requests
//!
//! Internal callers pass the secret in the X-Internal-API-Key header.
//! An unconfigured secret is a deployment defect (500), not an auth
//! failure; a missing or mismatched header is 401. Runs before the query
//! handler, so a rejected request never reaches the pipeline.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Header carrying the shared secret
pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

/// Middleware requiring a valid shared secret
pub async fn require_internal_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.auth.internal_api_key.as_deref() else {
        tracing::error!("INTERNAL_API_KEY not configured");
        return AppError::ServerConfig.into_response();
    };

    let provided = request
        .headers()
        .get(INTERNAL_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(expected) {
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}
