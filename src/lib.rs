//! # ner-curator
//!
//! Authenticated capture-and-curation service for named-entity annotations. Users
//! register and log in, send text to an external entity-prediction model, review the
//! predicted spans and store the curated result.
//!
//! ## Architecture
//!
//! ```text
//! REST API (axum) → Authentication Gate → Annotation Service → Prediction Service
//!        ↓                  ↓                     ↓
//!   Login Service    Session Tokens      Annotation Repository (SQLite)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ner_curator::{
//!     api::{start_api_server, ApiState},
//!     config::AppConfig,
//!     services::HttpPredictor,
//!     storage::create_pool,
//!     utils::SystemClock,
//!     Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let pool = create_pool(&config.database).await?;
//!     let predictor = Arc::new(HttpPredictor::new(&config.predictor)?);
//!     let state = ApiState::new(&config, pool, predictor, SystemClock::shared())?;
//!     start_api_server(&config.server, state).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "ner-curator");
    }
}
