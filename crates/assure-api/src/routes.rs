//! API route definitions

use crate::auth::require_internal_key;
use crate::handlers::query;
use crate::state::AppState;
use axum::{middleware, routing::post, Router};
use std::sync::Arc;

/// Create API v1 routes, all behind the shared-secret check
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/rag/query", post(query::query_handler))
        .layer(middleware::from_fn_with_state(state, require_internal_key))
}
