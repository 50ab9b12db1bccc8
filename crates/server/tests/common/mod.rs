//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the full router over JSON
//! stores in a temp dir, with the catalog and token store wrapped in mocks so
//! tests can inject failures.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use moviezone_core::{
    create_authenticator,
    testing::{MockCatalog, MockTokenStore},
    AuthConfig, AuthMethod, BotConfig,
    CatalogConfig, Config, Directory, JsonCatalog, JsonRequestStore, JsonTokenStore,
    ServerConfig, SqliteTokenStore, StorageConfig, TokenBackend, TokenConfig, TokenStore,
};
use moviezone_server::state::AppState;

/// Re-export fixtures for test convenience
pub use moviezone_core::testing::fixtures;

pub const BOT_OWNER: i64 = 1000;
pub const AD_PAGE: &str = "https://ads.example/watch.html";

/// Test fixture for API tests.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_add_title() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/titles", json!({
///         "title": "Jawan",
///         "uploader_id": 1
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Catalog wrapper - inject failures
    pub catalog: Arc<MockCatalog>,
    /// Token store wrapper - inject failures
    pub tokens: Arc<MockTokenStore>,
    /// Sent as `X-API-Key` on every request when set
    pub api_key: Option<String>,
    /// Temporary data directory
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
    /// Require this API key
    pub api_key: Option<String>,
    pub token_backend: TokenBackend,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_sqlite_tokens() -> Self {
        Self {
            token_backend: TokenBackend::Sqlite,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture without authentication.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let auth = match &test_config.api_key {
            Some(key) => AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(key.clone()),
            },
            None => AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
        };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            storage: StorageConfig {
                data_dir: temp_dir.path().to_path_buf(),
                token_backend: test_config.token_backend,
                sqlite_path: None,
            },
            tokens: TokenConfig {
                secret: Some("fixture-secret".to_string()),
                ..Default::default()
            },
            bot: BotConfig {
                owner_id: BOT_OWNER,
                username: "FixtureBot".to_string(),
                ad_page_url: AD_PAGE.to_string(),
            },
            catalog: CatalogConfig::default(),
        };

        let storage = &config.storage;
        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));
        let catalog = Arc::new(MockCatalog::wrap(Arc::new(
            JsonCatalog::open(&storage.movies_path()).expect("Failed to open catalog"),
        )));
        let backend: Arc<dyn TokenStore> = match storage.token_backend {
            TokenBackend::Json => Arc::new(
                JsonTokenStore::open(&storage.tokens_path()).expect("Failed to open token store"),
            ),
            TokenBackend::Sqlite => Arc::new(
                SqliteTokenStore::new(&storage.token_db_path())
                    .expect("Failed to open token database"),
            ),
        };
        let tokens = Arc::new(MockTokenStore::wrap(backend));
        let requests = Arc::new(
            JsonRequestStore::open(&storage.requests_path()).expect("Failed to open requests"),
        );
        let directory = Arc::new(
            Directory::open_in(BOT_OWNER, storage).expect("Failed to open directory"),
        );

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            catalog.clone(),
            tokens.clone(),
            requests,
            directory,
        ));

        // Create router
        let router = moviezone_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            catalog,
            tokens,
            api_key: test_config.api_key,
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

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Fetch `/metrics` as text.
    pub async fn metrics_text(&self) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri("/metrics")
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

    /// Send a request with explicit headers and no fixture credentials.
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }
        self.send(request_builder.body(Body::empty()).unwrap()).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = &self.api_key {
            request_builder = request_builder.header("X-API-Key", key);
        }

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

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {{
        let response = &$response;
        assert_eq!(
            response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            response.status,
            serde_json::to_string_pretty(&response.body).unwrap_or_default()
        );
    }};
}
