//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::backend::Backend;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Performs a one-row read against the backend.
/// Returns 503 Service Unavailable if it fails.
pub async fn readiness<B: Backend>(State(state): State<AppState<B>>) -> StatusCode {
    match state.backend().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
