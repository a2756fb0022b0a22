//! # Configuration Management
//!
//! Layered configuration: built-in defaults, an optional TOML file, then environment
//! variables prefixed with `NER_CURATOR__` (nested keys separated by `__`, e.g.
//! `NER_CURATOR__AUTH__SIGNING_KEY`). The legacy `SECRET_KEY` variable is accepted as
//! the signing key when the prefixed one is unset.
//!
//! Both signing key variables are read verbatim. Typed parsing of the other variables
//! would otherwise turn an all-digit key into a float and back.

pub mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, PredictorConfig, ServerConfig,
    DEFAULT_LABELS, DEFAULT_THRESHOLD, DEFAULT_TOKEN_TTL_MINUTES,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::auth::jwt::SigningKey;
use crate::errors::Result;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "NER_CURATOR";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "NER_CURATOR_CONFIG";

/// Environment variable holding the signing key
pub const SIGNING_KEY_ENV: &str = "NER_CURATOR__AUTH__SIGNING_KEY";

/// Legacy environment variable holding the signing key
pub const LEGACY_SECRET_ENV: &str = "SECRET_KEY";

/// Configuration file looked up (without extension) when no path is given
const DEFAULT_CONFIG_FILE: &str = "config/ner-curator";

impl AppConfig {
    /// Load configuration from the process environment and the default file locations.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::from_sources(path.as_deref(), None)
    }

    /// Load configuration from an optional file and an environment map.
    ///
    /// `env` replaces the process environment when given, which keeps tests hermetic.
    pub fn from_sources(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match file {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let signing_key = raw_var(env.as_ref(), SIGNING_KEY_ENV);
        let legacy_secret = raw_var(env.as_ref(), LEGACY_SECRET_ENV);

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("predictor.labels")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true)
            .source(env);

        let mut app_config: AppConfig = builder.add_source(environment).build()?.try_deserialize()?;

        if let Some(raw) = signing_key {
            app_config.auth.signing_key = Some(SigningKey::from(raw));
        } else if app_config.auth.signing_key.is_none() {
            app_config.auth.signing_key = legacy_secret.map(SigningKey::from);
        }

        app_config.validate()?;
        Ok(app_config)
    }
}

fn raw_var(env: Option<&HashMap<String, String>>, name: &str) -> Option<String> {
    match env {
        Some(map) => map.get(name).cloned(),
        None => std::env::var(name).ok(),
    }
}
