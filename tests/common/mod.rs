//! Common test utilities for E2E tests

#![allow(dead_code)]

use serde_json::{Value, json};
use snapgram::{AppState, auth::HmacIdentityProvider, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TOKEN_SECRET: &str = "test-secret-key-32-bytes-long!!!";
pub const ADMIN_ID: &str = "admin";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

fn test_config(backend: config::DatabaseBackend, temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            max_body_bytes: 200 * 1024 * 1024,
        },
        database: config::DatabaseConfig {
            backend,
            path: temp_dir.path().join("test.db"),
        },
        storage: config::StorageConfig {
            media: config::MediaStorageConfig {
                backend: config::MediaBackend::Memory,
                bucket: "test-media".to_string(),
                public_url: "https://media.test.example.com".to_string(),
            },
        },
        cloudflare: config::CloudflareConfig::default(),
        auth: config::AuthConfig {
            token_secret: TOKEN_SECRET.to_string(),
            token_max_age: 3600,
            admin_user_ids: vec![ADMIN_ID.to_string()],
        },
        feed: config::FeedConfig {
            max_fan_out: 500,
            per_author_limit: 50,
            default_page_size: 30,
            max_page_size: 100,
        },
        notifications: config::NotificationConfig { list_limit: 50 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Server backed by the in-memory document store
    pub async fn new() -> Self {
        Self::start(config::DatabaseBackend::Memory).await
    }

    /// Server backed by a SQLite database in a temporary directory
    pub async fn with_sqlite() -> Self {
        Self::start(config::DatabaseBackend::Sqlite).await
    }

    /// In-memory server that buffers at most `max_body_bytes` per request
    pub async fn with_body_limit(max_body_bytes: usize) -> Self {
        Self::start_with(config::DatabaseBackend::Memory, |config| {
            config.server.max_body_bytes = max_body_bytes;
        })
        .await
    }

    async fn start(backend: config::DatabaseBackend) -> Self {
        Self::start_with(backend, |_| {}).await
    }

    async fn start_with(
        backend: config::DatabaseBackend,
        customize: impl FnOnce(&mut config::AppConfig),
    ) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(backend, &temp_dir);
        customize(&mut config);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = snapgram::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Bearer token for `user_id`
    pub fn token_for(&self, user_id: &str) -> String {
        HmacIdentityProvider::new(TOKEN_SECRET, 3600)
            .issue_token(user_id)
            .expect("Failed to create test token")
    }

    pub async fn get(&self, path: &str, user_id: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(user_id) = user_id {
            request = request.bearer_auth(self.token_for(user_id));
        }
        request.send().await.unwrap()
    }

    pub async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        user_id: &str,
        body: Value,
    ) -> reqwest::Response {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.token_for(user_id))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_json(&self, path: &str, user_id: &str, body: Value) -> reqwest::Response {
        self.send_json(reqwest::Method::POST, path, user_id, body)
            .await
    }

    /// Create or update a profile through the API
    pub async fn seed_user(&self, user_id: &str) {
        let response = self
            .send_json(
                reqwest::Method::PUT,
                &format!("/api/users/update/{user_id}"),
                user_id,
                json!({
                    "username": user_id,
                    "fullname": format!("{user_id} test"),
                    "avatar": format!("https://media.test.example.com/{user_id}.png"),
                }),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    /// Upload an image post and return its id
    pub async fn upload_post(&self, user_id: &str, caption: &str) -> String {
        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
                    .file_name("photo.jpg")
                    .mime_str("image/jpeg")
                    .unwrap(),
            )
            .text("caption", caption.to_string());

        let response = self
            .client
            .post(self.url("/api/posts/upload"))
            .bearer_auth(self.token_for(user_id))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["postId"].as_str().unwrap().to_string()
    }
}
