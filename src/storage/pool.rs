//! # Database Connection Pool Management
//!
//! Provides database connection pool creation and management utilities.

use crate::config::DatabaseConfig;
use crate::errors::{Error, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{path::Path, str::FromStr, time::Duration};

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    validate_config(config)?;

    let pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true);

    let pool_options = if let Some(idle_timeout) = config.idle_timeout() {
        pool_options.idle_timeout(idle_timeout)
    } else {
        // A dropped :memory: connection takes its database with it.
        pool_options.idle_timeout(None).max_lifetime(None)
    };

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            Error::database(
                e,
                format!("Invalid SQLite connection string: {}", sanitize_url(&config.url)),
            )
        })?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT);

    let connect_options = if config.is_in_memory() {
        connect_options
    } else {
        ensure_parent_dir(connect_options.get_filename()).await?;
        connect_options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool = pool_options.connect_with(connect_options).await.map_err(|e| {
        tracing::error!(
            error = %e,
            url = %sanitize_url(&config.url),
            busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
            "Failed to create SQLite database pool"
        );
        Error::database(e, format!("Failed to connect to database: {}", sanitize_url(&config.url)))
    })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connect_timeout_ms = config.connect_timeout().as_millis(),
        idle_timeout_ms = config.idle_timeout().map(|d| d.as_millis()),
        in_memory = config.is_in_memory(),
        "Database connection pool created"
    );

    if config.auto_migrate {
        tracing::info!("Auto-migration enabled, running database migrations");
        crate::storage::migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

/// `create_if_missing` creates the database file but not the directory holding it.
async fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })
        }
        _ => Ok(()),
    }
}

/// Validate database configuration
fn validate_config(config: &DatabaseConfig) -> Result<()> {
    if config.max_connections == 0 {
        return Err(Error::validation("max_connections must be greater than 0"));
    }

    if config.min_connections > config.max_connections {
        return Err(Error::validation("min_connections cannot be greater than max_connections"));
    }

    if !config.url.starts_with("sqlite:") {
        return Err(Error::validation("database URL must start with 'sqlite:'"));
    }

    Ok(())
}

/// Strip query parameters from the URL before it is logged
fn sanitize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.query().is_some() => {
            parsed.set_query(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Get pool statistics for monitoring
pub fn get_pool_stats(pool: &DbPool) -> PoolStats {
    PoolStats { size: pool.size(), idle: pool.num_idle() }
}

/// Pool statistics for monitoring
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Total connections in the pool
    pub size: u32,
    /// Number of idle connections
    pub idle: usize,
}

impl PoolStats {
    /// Get the number of active connections
    pub fn active(&self) -> u32 {
        self.size.saturating_sub(self.idle as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config_valid() {
        let config = DatabaseConfig {
            url: "sqlite://./test.db".to_string(),
            max_connections: 10,
            min_connections: 2,
            ..Default::default()
        };

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_rejects_bad_values() {
        let zero = DatabaseConfig { max_connections: 0, ..Default::default() };
        assert!(validate_config(&zero).is_err());

        let inverted =
            DatabaseConfig { max_connections: 2, min_connections: 5, ..Default::default() };
        assert!(validate_config(&inverted).is_err());

        let postgres =
            DatabaseConfig { url: "postgresql://localhost/db".to_string(), ..Default::default() };
        assert!(validate_config(&postgres).is_err());
    }

    #[test]
    fn test_sanitize_url_drops_query() {
        assert_eq!(sanitize_url("sqlite://./data/app.db"), "sqlite://./data/app.db");
        assert!(!sanitize_url("sqlite://./data/app.db?mode=rwc").contains("mode"));
    }

    #[tokio::test]
    async fn test_in_memory_pool_is_migrated() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let stats = get_pool_stats(&pool);
        assert!(stats.size <= 1);
        assert!(stats.active() <= stats.size);
    }

    #[tokio::test]
    async fn test_file_pool_is_created_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("ner.db").display());
        let config = DatabaseConfig { url, max_connections: 2, ..Default::default() };

        let pool = create_pool(&config).await.unwrap();
        crate::storage::check_connection(&pool).await.unwrap();
        assert!(dir.path().join("ner.db").exists());
    }

    #[tokio::test]
    async fn test_missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("nested").join("ner.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 2,
            ..Default::default()
        };

        let pool = create_pool(&config).await.unwrap();
        crate::storage::check_connection(&pool).await.unwrap();
        assert!(db_path.exists());
    }
}
