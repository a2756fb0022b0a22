//! # Structured Logging
//!
//! Subscriber setup and span helpers built on the tracing ecosystem. `RUST_LOG` takes
//! precedence over `observability.log_level` when it is set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};

/// Create a tracing span for an authenticated request.
///
/// ```rust,ignore
/// let span = auth_span!("GET", "/annotations");
/// ```
#[macro_export]
macro_rules! auth_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "auth_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            username = tracing::field::Empty
        )
    };
}

fn env_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        }),
    }
}

/// Install the global subscriber. A subscriber set earlier (for example by a test
/// harness) is left in place.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = env_filter(config)?;

    let result = if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).try_init()
    };

    if result.is_err() {
        tracing::debug!("global tracing subscriber already installed");
    }
    Ok(())
}

/// Log the effective configuration without secrets.
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        database_in_memory = config.database.is_in_memory(),
        token_ttl_minutes = config.auth.token_ttl_minutes,
        signing_key_configured = config.auth.signing_key.is_some(),
        predictor_url = %config.predictor.url,
        labels = ?config.predictor.labels,
        threshold = config.predictor.threshold,
        metrics_port = config.observability.metrics_port,
        "ner-curator configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_macro_compiles() {
        let span = auth_span!("GET", "/annotations");
        span.record("username", "alice");
    }

    #[test]
    fn test_bad_log_level_is_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = ObservabilityConfig { log_level: "ner_curator=loud".into(), ..Default::default() };
        assert!(matches!(env_filter(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = ObservabilityConfig::default();
        init_logging(&config).unwrap();
        init_logging(&config).unwrap();
    }

    #[test]
    fn test_log_config_info() {
        log_config_info(&crate::config::AppConfig::default());
    }
}
