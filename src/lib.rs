//! Snapgram - backend for a photo-sharing social app
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - JSON endpoints under /api                                │
//! │  - Bearer-token authentication                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Follow graph, feed assembly, conversations               │
//! │  - Posts, stories, videos, notifications, moderation        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Document store (SQLite via sqlx, or in-memory)           │
//! │  - Media storage (Cloudflare R2, or in-memory)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `data`: Document store and models
//! - `storage`: Media storage
//! - `auth`: Token verification and the `CurrentUser` extractor
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Document store holding every collection
    pub store: Arc<dyn data::DocumentStore>,

    /// Media storage for uploaded images and videos
    pub media: Arc<dyn storage::MediaStore>,

    /// Verifies bearer tokens
    pub identity: Arc<dyn auth::IdentityProvider>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open the configured document store
    /// 2. Connect the configured media storage
    /// 3. Build the token verifier
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let store: Arc<dyn data::DocumentStore> = match config.database.backend {
            config::DatabaseBackend::Sqlite => {
                Arc::new(data::SqliteStore::connect(&config.database.path).await?)
            }
            config::DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory document store; data is lost on restart");
                Arc::new(data::MemoryStore::new())
            }
        };
        tracing::info!(backend = store.backend(), "Document store ready");

        let media: Arc<dyn storage::MediaStore> = match config.storage.media.backend {
            config::MediaBackend::R2 => Arc::new(storage::R2MediaStorage::new(
                &config.storage.media,
                &config.cloudflare,
            )?),
            config::MediaBackend::Memory => Arc::new(storage::MemoryMediaStore::new(
                &config.storage.media.public_url,
            )),
        };
        tracing::info!("Media storage initialized");

        let identity = Arc::new(auth::HmacIdentityProvider::new(
            config.auth.token_secret.clone(),
            config.auth.token_max_age,
        ));

        tracing::info!("Application state initialized successfully");
        Ok(Self::from_parts(config, store, media, identity))
    }

    /// Assemble state from already constructed backends
    pub fn from_parts(
        config: config::AppConfig,
        store: Arc<dyn data::DocumentStore>,
        media: Arc<dyn storage::MediaStore>,
        identity: Arc<dyn auth::IdentityProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            media,
            identity,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower::ServiceBuilder;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .route_layer(middleware::from_fn(api::metrics::track_http_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer)
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
