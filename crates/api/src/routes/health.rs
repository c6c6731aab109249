use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether a durable store is backing the playlist.
    pub persistence_enabled: bool,
    /// Open push-channel connections.
    pub connections: usize,
}

/// GET /health -- returns service health.
///
/// Memory-only mode is a supported configuration, so the status is `ok`
/// either way.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.coordinator.bus().subscriber_count().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        persistence_enabled: state.coordinator.persistence_enabled(),
        connections,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
