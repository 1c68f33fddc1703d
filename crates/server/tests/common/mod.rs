//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock service instances injected, so scans, availability checks and
//! routing can be exercised without external infrastructure.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use requestarr_core::arr::{MovieLookup, SeriesLookup};
use requestarr_core::config::SyncConfig;
use requestarr_core::scan::{MediaSyncer, RadarrScanner, ScanSession, SonarrScanner};
use requestarr_core::testing::{MockInventorySource, MockMovieLookup, MockSeriesLookup};
use requestarr_core::{
    load_config_from_str, AvailabilityAggregator, InventorySource, MediaStore, OverrideEvaluator,
    ReconciliationEngine, RequestRouter, RoutingResolver, ScanController, SqliteMediaStore,
    SqliteRuleStore, SyncScheduler,
};
use requestarr_server::state::AppState;

/// Re-export fixtures for test convenience
pub use requestarr_core::testing::fixtures;

const TEST_CONFIG: &str = r#"
[scheduler]
enabled = false

[[radarr]]
id = 1
name = "Radarr"
url = "http://radarr:7878"
api_key = "radarr-secret"
is_default = true
active_profile_id = 4
active_directory = "/movies"

[[radarr]]
id = 2
name = "Radarr 4K"
url = "http://radarr-4k:7878"
api_key = "radarr-4k-secret"
is_4k = true
active_directory = "/movies-4k"

[[sonarr]]
id = 1
name = "Sonarr"
url = "http://sonarr:8989"
api_key = "sonarr-secret"
is_default = true
active_directory = "/tv"
"#;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_scan() {
///     let fixture = TestFixture::new();
///     fixture.radarr.add_item(fixtures::movie_item(1, 603, 1)).await;
///
///     let response = fixture.post("/api/v1/scans/radarr/run", json!({})).await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Media store shared with the scanners
    pub store: Arc<SqliteMediaStore>,
    /// Rule store backing the routing resolver
    pub rules: Arc<SqliteRuleStore>,
    /// Radarr inventory scanned by the "radarr" controller
    pub radarr: Arc<MockInventorySource>,
    /// Sonarr inventory scanned by the "sonarr" controller
    pub sonarr: Arc<MockInventorySource>,
    /// Standard Radarr instance for availability lookups
    pub movies: Arc<MockMovieLookup>,
    /// 4K Radarr instance for availability lookups
    pub movies_4k: Arc<MockMovieLookup>,
    /// Sonarr instance for availability lookups
    pub shows: Arc<MockSeriesLookup>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let config = load_config_from_str(TEST_CONFIG).expect("Failed to parse test config");

        // Create stores
        let store =
            Arc::new(SqliteMediaStore::new(&db_path).expect("Failed to create media store"));
        let rules = Arc::new(SqliteRuleStore::new(&db_path).expect("Failed to create rule store"));
        let engine = Arc::new(ReconciliationEngine::new(
            Arc::clone(&store) as Arc<dyn MediaStore>
        ));

        // Create mocks
        let radarr = Arc::new(MockInventorySource::new(fixtures::source(1, "radarr", false)));
        let sonarr = Arc::new(MockInventorySource::new(fixtures::source(1, "sonarr", false)));
        let movies = Arc::new(MockMovieLookup::new(1, false));
        let movies_4k = Arc::new(MockMovieLookup::new(2, true));
        let shows = Arc::new(MockSeriesLookup::new(1, false));

        let sync = SyncConfig {
            batch_size: 10,
            batch_delay_ms: 1,
        };
        let syncer = MediaSyncer::new(Arc::clone(&engine));
        let controllers: Vec<Arc<dyn ScanController>> = vec![
            Arc::new(ScanSession::new(
                RadarrScanner::new(
                    syncer.clone(),
                    vec![Arc::clone(&radarr) as Arc<dyn InventorySource>],
                ),
                sync.clone(),
                None,
            )),
            Arc::new(ScanSession::new(
                SonarrScanner::new(syncer, vec![Arc::clone(&sonarr) as Arc<dyn InventorySource>]),
                sync,
                None,
            )),
        ];

        let aggregator = Arc::new(AvailabilityAggregator::new(
            vec![
                Arc::clone(&movies) as Arc<dyn MovieLookup>,
                Arc::clone(&movies_4k) as Arc<dyn MovieLookup>,
            ],
            vec![Arc::clone(&shows) as Arc<dyn SeriesLookup>],
        ));
        let scheduler = Arc::new(SyncScheduler::new(
            config.scheduler.clone(),
            controllers.clone(),
            Some(Arc::clone(&aggregator)),
        ));

        let settings = config.service_settings();
        let request_router = Arc::new(RequestRouter::new(
            config.routing.mode,
            RoutingResolver::new(rules.clone(), settings.clone()),
            OverrideEvaluator::new(rules.clone(), settings),
            engine,
        ));

        let state = Arc::new(AppState::new(
            config,
            controllers,
            scheduler,
            aggregator,
            request_router,
        ));

        Self {
            router: requestarr_server::api::create_router(state),
            store,
            rules,
            radarr,
            sonarr,
            movies,
            movies_4k,
            shows,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Poll `GET /scans` until the scanner is idle with an outcome.
    pub async fn wait_for_scan(&self, service: &str) -> Value {
        for _ in 0..100 {
            let response = self.get("/api/v1/scans").await;
            let status = response.body["scanners"]
                .as_array()
                .and_then(|scanners| scanners.iter().find(|s| s["service"] == service))
                .cloned()
                .unwrap_or(Value::Null);
            if status["running"] == false && !status["last_outcome"].is_null() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("scan of {} did not finish in time", service);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
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

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
