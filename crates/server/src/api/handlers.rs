use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use reseedjump_core::SanitizedConfig;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whether a reseed run is executing right now.
    pub run_in_progress: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        run_in_progress: state
            .orchestrator()
            .map(|o| o.is_running())
            .unwrap_or(false),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
///
/// Prometheus text exposition.
pub async fn metrics() -> String {
    crate::metrics::encode_metrics()
}
