use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, stats};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Statistics
        .route("/stats", get(stats::get_stats))
        .route("/stats/reprocess", get(stats::reprocess).post(stats::reprocess))
        .route("/stats/clear", get(stats::clear).post(stats::clear))
        // Legacy maintenance paths
        .route(
            "/reprocess_historical_data",
            get(stats::reprocess).post(stats::reprocess),
        )
        .route(
            "/clear_all_history_data",
            get(stats::clear).post(stats::clear),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
