//! Common test utilities for E2E tests

#![allow(dead_code)]

use birdhouse::data::User;
use birdhouse::{AppState, config};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ALICE_KEY: &str = "alice-key";
pub const BOB_KEY: &str = "bob-key";
pub const BOOTSTRAP_KEY: &str = "test";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
    pub alice: User,
    pub bob: User,
}

impl TestServer {
    /// Create a new test server instance with users `alice` and `bob`
    /// plus the bootstrap user (`test user` / `test`)
    pub async fn new() -> Self {
        birdhouse::metrics::init_metrics();

        // Create temporary directory for database and media
        let temp_dir = TempDir::new().unwrap();

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                api_prefix: "/api".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_dir.path().join("test.db"),
                max_connections: 5,
            },
            storage: config::StorageConfig {
                media_dir: temp_dir.path().join("media"),
                max_upload_bytes: 1024 * 1024,
            },
            auth: config::AuthConfig {
                header_name: "api-key".to_string(),
            },
            bootstrap: config::BootstrapConfig {
                enabled: true,
                username: "test user".to_string(),
                api_key: BOOTSTRAP_KEY.to_string(),
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();
        let alice = state.db.create_user("alice", ALICE_KEY).await.unwrap();
        let bob = state.db.create_user("bob", BOB_KEY).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = birdhouse::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
            alice,
            bob,
        }
    }

    /// Get URL for a non-API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Get URL for an API path
    pub fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.addr, path)
    }

    /// Post a tweet and return its id
    pub async fn create_tweet(&self, api_key: &str, content: &str, media_ids: &[i64]) -> i64 {
        let response = self
            .client
            .post(self.api("/tweets"))
            .header("api-key", api_key)
            .json(&serde_json::json!({
                "tweet_data": content,
                "tweet_media_ids": media_ids,
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["result"], true);
        body["tweet_id"].as_i64().unwrap()
    }

    /// Upload a file and return the media id
    pub async fn upload(&self, api_key: &str, file_name: &str, data: &[u8]) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post(self.api("/medias"))
            .header("api-key", api_key)
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// `GET /api/tweets` as `api_key`, returning the `tweets` array
    pub async fn list_tweets(&self, api_key: &str) -> Vec<Value> {
        let response = self
            .client
            .get(self.api("/tweets"))
            .header("api-key", api_key)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["result"], true);
        body["tweets"].as_array().unwrap().clone()
    }
}

/// Assert an error envelope and return nothing on success
pub async fn assert_error(
    response: reqwest::Response,
    status: u16,
    error_type: &str,
    error_message: Option<&str>,
) {
    assert_eq!(response.status(), status);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], false);
    assert_eq!(body["error_type"], error_type);
    if let Some(message) = error_message {
        assert_eq!(body["error_message"], message);
    }
}
