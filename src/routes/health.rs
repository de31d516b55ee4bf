//! Health check endpoints for container orchestration.
//!
//! `/health` is a liveness probe: it only checks that the process can respond
//! to HTTP. `/ready` is a readiness probe: it also requires the store to
//! answer, so the orchestrator holds dependants back until the database is
//! reachable.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness handler.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness handler.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}
