//! HTTP request handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fanout_core::RunEvent;
use fanout_supervisor::SupervisorError;
use futures_util::StreamExt;
use tracing::info;

use crate::metrics;
use crate::state::AppState;

use super::responses::{ErrorResponse, PromptBody, PromptResponse};

/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::collect_metrics(&state),
    )
}

/// Synchronous prompt endpoint: dispatch the request as a run and block
/// until it completes or the run deadline forces a partial response.
pub async fn prompt(State(state): State<Arc<AppState>>, Json(body): Json<PromptBody>) -> Response {
    match state.supervisor.run(body.into_request()).await {
        Ok(result) => {
            info!(run_id = %result.run_id, partial = result.partial, "prompt run finished");
            state.record_completed(result.partial);
            (StatusCode::OK, Json(PromptResponse::from(result))).into_response()
        }
        Err(e) => {
            match &e {
                SupervisorError::InvalidRequest(_) => state.record_rejected(),
                _ => state.record_failed(),
            }
            error_response(&e)
        }
    }
}

/// Streaming prompt endpoint: dispatch the request as a run and stream its
/// events as newline-delimited JSON frames. Per-task events are wrapped in
/// a `response` field alongside the session id; the final frame carries the
/// aggregated response or the run error.
pub async fn prompt_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PromptBody>,
) -> Response {
    let handle = match state.supervisor.submit(body.into_request()).await {
        Ok(handle) => handle,
        Err(e) => {
            state.record_rejected();
            return error_response(&e);
        }
    };

    let session_id = handle.run_id().to_string();
    let (events, outcome) = handle.split().await;

    // Outcome counters are recorded from the run driver side; the client
    // may drop the response stream before the terminal frame arrives.
    tokio::spawn(async move {
        match outcome.await {
            Some(Ok(result)) => state.record_completed(result.partial),
            _ => state.record_failed(),
        }
    });

    let frames = events.map(move |event| {
        let frame = match &event {
            RunEvent::RunCompleted { response, .. } => serde_json::json!({
                "response": response,
                "session_id": &session_id,
            }),
            RunEvent::RunFailed { error, .. } => serde_json::json!({
                "error": error,
                "session_id": &session_id,
            }),
            task_event => serde_json::json!({
                "response": task_event,
                "session_id": &session_id,
            }),
        };
        Ok::<String, Infallible>(format!("{frame}\n"))
    });

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(frames))
    {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn error_response(e: &SupervisorError) -> Response {
    let status = match e {
        SupervisorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SupervisorError::AllTasksFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}
