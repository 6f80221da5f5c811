//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the full router around an
//! on-disk store and a [`MockBus`], so dispatched requests can be inspected
//! and results fed back without a broker.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use mrcontent_core::testing::MockBus;
use mrcontent_core::{
    AuthConfig, AuthMethod, Authenticator, Config, ContentRecord, ContentStore, DatabaseConfig,
    GatewayAuthenticator, MessageBus, NoneAuthenticator, ProcessingConfig, SqliteContentStore,
};
use mrcontent_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use mrcontent_core::testing::fixtures;

/// Test fixture with the router, its state and the mock bus behind it.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/mr-content", json!({ "name": "Demo" })).await;
///
///     assert_eq!(response.status, StatusCode::CREATED);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub state: Arc<AppState>,
    pub bus: Arc<MockBus>,
    pub store: Arc<dyn ContentStore>,
    /// Identity headers sent with every request in gateway mode
    pub identity: Option<(String, String)>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<JoinHandle<()>>,
    /// Keeps the database alive for the fixture's lifetime
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require gateway identity headers
    pub gateway_auth: bool,
    /// Start the result-topic workers
    pub subscribe_results: bool,
    pub processing: ProcessingConfig,
}

impl TestConfig {
    pub fn with_gateway() -> Self {
        Self {
            gateway_auth: true,
            ..Default::default()
        }
    }

    pub fn with_subscriptions() -> Self {
        Self {
            subscribe_results: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with anonymous auth.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let method = if test_config.gateway_auth {
            AuthMethod::Gateway
        } else {
            AuthMethod::None
        };

        let config = Config {
            auth: AuthConfig { method },
            database: DatabaseConfig {
                path: db_path.clone(),
                timeout_ms: 2000,
            },
            processing: test_config.processing.clone(),
            ..Default::default()
        };

        let authenticator: Arc<dyn Authenticator> = match method {
            AuthMethod::None => Arc::new(NoneAuthenticator::new()),
            AuthMethod::Gateway => Arc::new(GatewayAuthenticator::new()),
        };
        let store: Arc<dyn ContentStore> = Arc::new(
            SqliteContentStore::new(&db_path).expect("Failed to create content store"),
        );
        let bus = Arc::new(MockBus::new());

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::clone(&store),
            Arc::clone(&bus) as Arc<dyn MessageBus>,
        ));

        let (shutdown_tx, _) = broadcast::channel(1);
        let workers = if test_config.subscribe_results {
            state
                .ingestor()
                .start_subscriptions(state.bus(), &shutdown_tx)
                .await
                .expect("Failed to start result subscriptions")
        } else {
            Vec::new()
        };

        let router = create_router(Arc::clone(&state));

        Self {
            router,
            state,
            bus,
            store,
            identity: test_config
                .gateway_auth
                .then(|| (fixtures::USER.to_string(), fixtures::ORGANIZATION.to_string())),
            shutdown_tx,
            workers,
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

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
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

    /// Send a request as a specific gateway identity, or none.
    pub async fn request_as(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        identity: Option<(&str, &str)>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some((user, organization)) = identity {
            request_builder = request_builder
                .header("X-User-Id", user)
                .header("X-Organization-Id", organization);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let identity = self
            .identity
            .as_ref()
            .map(|(user, organization)| (user.as_str(), organization.as_str()));
        self.request_as(method, path, body, identity).await
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

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Wait until `count` messages were published on `topic`.
    pub async fn wait_for_published(&self, topic: &str, count: usize) -> Vec<Value> {
        for _ in 0..100 {
            let payloads = self.bus.published_on(topic).await;
            if payloads.len() >= count {
                return payloads
                    .iter()
                    .map(|p| serde_json::from_slice(p).expect("Published payload is not JSON"))
                    .collect();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Timed out waiting for {} messages on {}", count, topic);
    }

    /// Wait until a record reaches `status`.
    pub async fn wait_for_status(&self, id: &str, status: &str) -> ContentRecord {
        for _ in 0..100 {
            if let Some(record) = self.store.get(id).await.expect("Store read failed") {
                if record.status.as_str() == status {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Timed out waiting for {} to become {}", id, status);
    }

    /// Wait until the tracker holds `remaining` tasks for a record.
    pub async fn wait_for_remaining(&self, id: &str, remaining: u32) {
        for _ in 0..100 {
            if self.state.tracker().remaining(id) == Some(remaining) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Timed out waiting for {} to have {} remaining tasks", id, remaining);
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
