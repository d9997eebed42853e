//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8000)
    pub port: u16,
    /// Path prefix every API route is nested under (e.g., "/api")
    pub api_prefix: String,
}

impl ServerConfig {
    /// Address string accepted by `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Upper bound of pooled connections
    pub max_connections: u32,
}

/// Media storage configuration (local filesystem)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded files are written to
    pub media_dir: PathBuf,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
}

/// API key authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Request header carrying the raw API key
    pub header_name: String,
}

/// Bootstrap user created on startup when absent
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub username: String,
    pub api_key: String,
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
    /// 4. Environment variables (BIRDHOUSE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.api_prefix", "/api")?
            .set_default("database.path", "data/birdhouse.db")?
            .set_default("database.max_connections", 5)?
            .set_default("storage.media_dir", "media")?
            .set_default("storage.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("auth.header_name", "api-key")?
            .set_default("bootstrap.enabled", true)?
            .set_default("bootstrap.username", "test user")?
            .set_default("bootstrap.api_key", "test")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("BIRDHOUSE")
                    .separator("__")
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

        if !self.server.api_prefix.starts_with('/') {
            return Err(AppError::Config(
                "server.api_prefix must start with '/'".to_string(),
            ));
        }

        // Nesting at the root or under a trailing slash is not routable
        if self.server.api_prefix.len() < 2 || self.server.api_prefix.ends_with('/') {
            return Err(AppError::Config(
                "server.api_prefix must name a path segment and not end with '/'".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.storage.media_dir.as_os_str().is_empty() {
            return Err(AppError::Config(
                "storage.media_dir must not be empty".to_string(),
            ));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(AppError::Config(
                "storage.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.auth.header_name.trim().is_empty() {
            return Err(AppError::Config(
                "auth.header_name must not be empty".to_string(),
            ));
        }

        if self.bootstrap.enabled
            && (self.bootstrap.username.trim().is_empty() || self.bootstrap.api_key.is_empty())
        {
            return Err(AppError::Config(
                "bootstrap.username and bootstrap.api_key are required when bootstrap.enabled=true"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
