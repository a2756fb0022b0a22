//! # Command Line Interface
//!
//! `serve` (the default) runs the HTTP service; `migrate` applies the embedded schema
//! migrations and exits.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::api::{start_api_server, ApiState};
use crate::config::{AppConfig, DatabaseConfig, CONFIG_PATH_ENV};
use crate::errors::Result;
use crate::observability::{init_logging, init_observability, log_config_info};
use crate::services::HttpPredictor;
use crate::storage::{create_pool, list_applied_migrations, run_migrations};
use crate::utils::clock::SystemClock;
use crate::{APP_NAME, VERSION};

#[derive(Debug, Parser)]
#[command(name = "ner-curator")]
#[command(about = "Authenticated capture and curation of named-entity annotations")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to $NER_CURATOR_CONFIG, then config/ner-curator.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Apply pending database migrations and exit
    Migrate {
        /// Print every applied migration afterwards
        #[arg(long)]
        list: bool,
    },
}

impl Cli {
    /// Load configuration, applying command line overrides on top.
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config.clone().or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        let mut config = AppConfig::from_sources(path.as_deref(), None)?;

        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
            config.validate()?;
        }

        Ok(config)
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate { list } => migrate(config, list).await,
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    init_observability(&config.observability).await?;
    info!(app_name = APP_NAME, version = VERSION, "Starting NER annotation service");
    log_config_info(&config);

    let pool = create_pool(&config.database).await?;
    let predictor = Arc::new(HttpPredictor::new(&config.predictor)?);
    let state = ApiState::new(&config, pool, predictor, SystemClock::shared())?;

    start_api_server(&config.server, state).await
}

async fn migrate(config: AppConfig, list: bool) -> Result<()> {
    init_logging(&config.observability)?;

    let db_config = DatabaseConfig { auto_migrate: false, ..config.database };
    let pool = create_pool(&db_config).await?;

    info!("Applying database migrations");
    run_migrations(&pool).await?;

    let applied = list_applied_migrations(&pool).await?;
    info!(count = applied.len(), "Migrations up to date");

    if list {
        for migration in applied {
            println!("{}\t{}", migration.version, migration.description);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::parse_from(["ner-curator"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["ner-curator", "migrate", "--list"]);
        assert!(matches!(cli.command, Some(Commands::Migrate { list: true })));
    }

    #[test]
    fn global_overrides_parse_after_subcommand() {
        let cli = Cli::parse_from(["ner-curator", "serve", "--database-url", "sqlite::memory:"]);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
    }
}
