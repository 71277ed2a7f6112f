//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 5000)
    pub port: u16,
    /// Public domain (e.g., "api.snapgram.app")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Largest accepted request body in bytes (uploads included)
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://api.snapgram.app"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Document store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// Path to SQLite database file (sqlite backend only)
    pub path: PathBuf,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub media: MediaStorageConfig,
}

/// Media storage backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    R2,
    #[default]
    Memory,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaStorageConfig {
    #[serde(default)]
    pub backend: MediaBackend,
    /// R2 bucket name for media
    pub bucket: String,
    /// Public URL for media (Custom Domain)
    /// e.g., "https://media.example.com"
    pub public_url: String,
}

/// Cloudflare credentials (r2 media backend only)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CloudflareConfig {
    /// Cloudflare account ID
    #[serde(default)]
    pub account_id: String,
    /// R2 access key ID
    #[serde(default)]
    pub r2_access_key_id: String,
    /// R2 secret access key
    #[serde(default)]
    pub r2_secret_access_key: String,
}

/// Bearer token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens (32+ bytes)
    pub token_secret: String,
    /// Token max age in seconds (default: 604800 = 7 days)
    pub token_max_age: i64,
    /// User ids allowed to review verification requests
    #[serde(default)]
    pub admin_user_ids: Vec<String>,
}

impl AuthConfig {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == user_id)
    }
}

/// Feed fan-out limits
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Maximum number of followed authors queried per feed request
    pub max_fan_out: usize,
    /// Maximum posts fetched per followed author per page
    pub per_author_limit: usize,
    /// Page size when the client does not ask for one
    pub default_page_size: usize,
    /// Upper bound on client-requested page size
    pub max_page_size: usize,
}

/// Notification listing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Newest notifications returned per listing (default: 50)
    pub list_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SNAPGRAM__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("server.max_body_bytes", 200 * 1024 * 1024)?
            .set_default("database.backend", "sqlite")?
            .set_default("database.path", "data/snapgram.db")?
            .set_default("storage.media.backend", "memory")?
            .set_default("storage.media.bucket", "snapgram-media")?
            .set_default("storage.media.public_url", "http://localhost:5000/media")?
            .set_default("auth.token_max_age", 604800)?
            .set_default("feed.max_fan_out", 500)?
            .set_default("feed.per_author_limit", 50)?
            .set_default("feed.default_page_size", 30)?
            .set_default("feed.max_page_size", 100)?
            .set_default("notifications.list_limit", 50)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (SNAPGRAM__*)
            .add_source(
                Environment::with_prefix("SNAPGRAM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_user_ids")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        const MIN_TOKEN_SECRET_BYTES: usize = 32;

        if self.auth.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        if self.auth.token_max_age <= 0 {
            return Err(AppError::Config(
                "auth.token_max_age must be greater than 0".to_string(),
            ));
        }

        if self.feed.max_fan_out == 0
            || self.feed.per_author_limit == 0
            || self.feed.default_page_size == 0
        {
            return Err(AppError::Config(
                "feed limits must be greater than 0".to_string(),
            ));
        }

        if self.feed.default_page_size > self.feed.max_page_size {
            return Err(AppError::Config(
                "feed.default_page_size must not exceed feed.max_page_size".to_string(),
            ));
        }

        if self.notifications.list_limit == 0 {
            return Err(AppError::Config(
                "notifications.list_limit must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.storage.media.public_url).is_err() {
            return Err(AppError::Config(
                "storage.media.public_url must be an absolute URL".to_string(),
            ));
        }

        if self.storage.media.backend == MediaBackend::R2
            && (self.cloudflare.account_id.is_empty()
                || self.cloudflare.r2_access_key_id.is_empty()
                || self.cloudflare.r2_secret_access_key.is_empty())
        {
            return Err(AppError::Config(
                "cloudflare credentials are required when storage.media.backend=r2".to_string(),
            ));
        }

        if is_local_server_domain(&self.server.domain) {
            if !self.server.protocol.eq_ignore_ascii_case("https") {
                tracing::warn!(
                    host = %normalized_server_host(&self.server.domain),
                    "Serving plain http for local development"
                );
            }
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                max_body_bytes: 200 * 1024 * 1024,
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Memory,
                path: PathBuf::from("/tmp/snapgram-test.db"),
            },
            storage: StorageConfig {
                media: MediaStorageConfig {
                    backend: MediaBackend::Memory,
                    bucket: "media".to_string(),
                    public_url: "https://media.example.com".to_string(),
                },
            },
            cloudflare: CloudflareConfig::default(),
            auth: AuthConfig {
                token_secret: "x".repeat(32),
                token_max_age: 604_800,
                admin_user_ids: vec!["admin".to_string()],
            },
            feed: FeedConfig {
                max_fan_out: 500,
                per_author_limit: 50,
                default_page_size: 30,
                max_page_size: 100,
            },
            notifications: NotificationConfig { list_limit: 50 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_token_secret() {
        let mut config = valid_config();
        config.auth.token_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("token secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.token_secret")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "api.snapgram.app".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_zero_feed_limits() {
        let mut config = valid_config();
        config.feed.per_author_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_credentials_for_r2() {
        let mut config = valid_config();
        config.storage.media.backend = MediaBackend::R2;
        assert!(config.validate().is_err());

        config.cloudflare = CloudflareConfig {
            account_id: "account".to_string(),
            r2_access_key_id: "key".to_string(),
            r2_secret_access_key: "secret".to_string(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn admin_lookup_matches_configured_ids() {
        let config = valid_config();
        assert!(config.auth.is_admin("admin"));
        assert!(!config.auth.is_admin("someone-else"));
    }
}
