use anyhow::Context;
use clap::Parser;
use ner_curator::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    // This must happen before any config is read from environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    ner_curator::cli::run(Cli::parse()).await.context("ner-curator exited with an error")
}
