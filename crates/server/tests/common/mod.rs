//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the router over a
//! temporary SQLite statistics store and mock downloaders, enabling API
//! tests without external infrastructure.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use reseedjump_core::{
    testing::{MockDownloaderClient, MockNotifier},
    Config, DatabaseConfig, DownloaderClient, JobConfig, RunOrchestrator, SqliteKvStore,
    StatsAggregator, RISK_CONFIRMATION_TEXT,
};
use reseedjump_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use reseedjump_core::testing::fixtures;

/// Test fixture with a real statistics store and a mock downloader.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Statistics aggregator shared with the router
    pub stats: Arc<StatsAggregator>,
    /// Orchestrator wired to the mock downloader
    pub orchestrator: Arc<RunOrchestrator>,
    /// Mock downloader - seed torrents and script failures
    pub client: MockDownloaderClient,
    /// Temporary directory for the database and exports
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with no tracker mapping.
    pub async fn new() -> Self {
        Self::with_mapping("").await
    }

    /// Create a test fixture whose job uses the given tracker mapping text.
    pub async fn with_mapping(tracker_mapping: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            job: JobConfig {
                enabled: false,
                notify: false,
                downloaders: vec!["qb".to_string()],
                include_tags: String::new(),
                risk_confirmation: RISK_CONFIRMATION_TEXT.to_string(),
                export_dir: Some(temp_dir.path().join("exports")),
                tracker_mapping: tracker_mapping.to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let store = Arc::new(SqliteKvStore::new(&db_path).expect("Failed to create store"));
        let stats = Arc::new(StatsAggregator::new(store));
        let client = MockDownloaderClient::new("qb");

        let orchestrator = Arc::new(RunOrchestrator::new(
            config.job.clone(),
            vec![Arc::new(client.clone()) as Arc<dyn DownloaderClient>],
            Arc::clone(&stats),
            Arc::new(MockNotifier::new()),
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&stats),
            Some(Arc::clone(&orchestrator)),
        ));
        let router = create_router(state);

        Self {
            router,
            stats,
            orchestrator,
            client,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
