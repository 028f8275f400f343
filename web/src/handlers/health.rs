//! Health check endpoints.
//!
//! Used by load balancers and orchestrators.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

/// Readiness report.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    /// `"ready"` or `"unavailable"`
    pub status: &'static str,
    /// Number of connected realtime subscribers
    pub realtime_subscribers: usize,
    /// Side effects still in flight
    pub pending_side_effects: usize,
}

/// `GET /health`: liveness only, no dependency checks.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// `GET /ready`: 200 if the aggregate store answers, 503 otherwise.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let (status, label) = match state.service.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        },
    };

    (
        status,
        Json(Readiness {
            status: label,
            realtime_subscribers: state.hub.subscriber_count(),
            pending_side_effects: state.service.dispatcher().pending(),
        }),
    )
}
