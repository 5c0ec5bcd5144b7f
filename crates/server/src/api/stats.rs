//! Statistics API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{error, info};
use reseedjump_core::{StatsDocument, StatsSummary};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub summary: StatsSummary,
    pub stats: StatsDocument,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Outcome of a maintenance operation.
#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub success: bool,
    pub message: String,
}

impl MaintenanceResponse {
    fn ok(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                message: message.into(),
            }),
        )
    }

    fn failed(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self {
                success: false,
                message: message.into(),
            }),
        )
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/stats
///
/// The full statistics document with today and cumulative totals.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, impl IntoResponse> {
    let stats = state.stats();

    match stats.snapshot() {
        Ok(doc) => Ok(Json(StatsResponse {
            summary: doc.summary(today()),
            stats: doc,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// POST|GET /api/v1/stats/reprocess
///
/// Re-run site classification over stored statistics with the configured mapping.
pub async fn reprocess(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mapping = state.tracker_mapping();

    match state.stats().reclassify_all(&mapping) {
        Ok(report) => {
            info!(
                daily_entries = report.daily_entries,
                total_entries = report.total_entries,
                "Historical statistics reprocessed"
            );
            MaintenanceResponse::ok("历史数据重新处理完成")
        }
        Err(e) => {
            error!(error = %e, "Failed to reprocess historical statistics");
            MaintenanceResponse::failed(format!("重新处理失败: {}", e))
        }
    }
}

/// POST|GET /api/v1/stats/clear
///
/// Drop every daily and cumulative statistic.
pub async fn clear(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.stats().reset_all() {
        Ok(()) => {
            info!("All historical statistics cleared");
            MaintenanceResponse::ok("所有历史数据已清理完成")
        }
        Err(e) => {
            error!(error = %e, "Failed to clear historical statistics");
            MaintenanceResponse::failed(format!("清理失败: {}", e))
        }
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
