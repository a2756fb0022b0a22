//! # Configuration Settings
//!
//! Defines the configuration structure for the annotation service.

use crate::auth::jwt::SigningKey;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

/// Default entity categories requested from the prediction service.
pub const DEFAULT_LABELS: [&str; 5] = ["Person", "Ort", "Organisation", "Datum", "Produkt"];

/// Default acceptance threshold passed to the prediction service.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default session token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 30;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Prediction collaborator configuration
    #[validate(nested)]
    pub predictor: PredictorConfig,

    /// Logging and metrics configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(Error::validation_field(
                "Database URL must start with 'sqlite:'",
                "database.url",
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(Error::validation_field(
                "min_connections cannot be greater than max_connections",
                "database.min_connections",
            ));
        }

        // Absence of the key is fatal; there is deliberately no fallback value.
        match &self.auth.signing_key {
            None => {
                return Err(Error::config(
                    "signing key is not configured (set NER_CURATOR__AUTH__SIGNING_KEY or SECRET_KEY)",
                ))
            }
            Some(key) => key.check_strength()?,
        }

        if self.predictor.labels.iter().any(|label| label.trim().is_empty()) {
            return Err(Error::validation_field(
                "Entity labels cannot be blank",
                "predictor.labels",
            ));
        }

        if !(self.predictor.threshold > 0.0 && self.predictor.threshold <= 1.0) {
            return Err(Error::validation_field(
                "Threshold must be greater than 0 and at most 1",
                "predictor.threshold",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Maximum request body size in bytes
    #[validate(range(min = 1024, message = "Max body size must be at least 1KB"))]
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,

    /// CORS allowed origins (empty = allow all)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_body_size: 2 * 1024 * 1024,
            enable_cors: true,
            cors_origins: vec![],
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Apply pending migrations when the pool is created
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/ner-curator.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a private in-memory database, used by tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            // Every connection to :memory: is its own database.
            max_connections: 1,
            min_connections: 1,
            idle_timeout_seconds: 0,
            auto_migrate: true,
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key used to sign session tokens
    pub signing_key: Option<SigningKey>,

    /// Session token lifetime in minutes
    #[validate(range(
        min = 1,
        max = 1440,
        message = "Token TTL must be between 1 minute and 24 hours"
    ))]
    pub token_ttl_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { signing_key: None, token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes as i64)
    }

    /// The configured signing key, or a configuration error if none was supplied.
    pub fn require_signing_key(&self) -> Result<&SigningKey> {
        self.signing_key.as_ref().ok_or_else(|| Error::config("signing key is not configured"))
    }
}

/// Prediction service configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct PredictorConfig {
    /// Base URL of the prediction service
    #[validate(url(message = "Predictor URL must be a valid URL"))]
    pub url: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 600, message = "Timeout must be between 1 and 600 seconds"))]
    pub timeout_seconds: u64,

    /// Entity categories requested for every prediction, in order
    #[validate(length(min = 1, message = "At least one entity label is required"))]
    pub labels: Vec<String>,

    /// Minimum score for an entity to be returned
    pub threshold: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9000".to_string(),
            timeout_seconds: 30,
            labels: DEFAULT_LABELS.iter().map(|label| label.to_string()).collect(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl PredictorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Prometheus exporter port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to exported metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            metrics_port: 0,
            service_name: "ner-curator".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}
