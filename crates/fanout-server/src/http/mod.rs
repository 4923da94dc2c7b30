//! HTTP server for the fanout boundary.
//!
//! Provides endpoints for:
//! - Synchronous prompts (`/agent/prompt`)
//! - Streaming prompts, newline-delimited JSON (`/agent/prompt/stream`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/agent/prompt", post(handlers::prompt))
        .route("/agent/prompt/stream", post(handlers::prompt_stream))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(cors)
        .with_state(state)
}
