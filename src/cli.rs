//! CLI interface for move-dataset: command parsing and orchestration glue.
//!
//! All business logic lives in the other modules; this module only exposes
//! the user-facing subcommands and an async [`run`] entrypoint that is also
//! callable from integration tests.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::dataset::build_dataset;
use crate::generate::AnthropicGenerator;
use crate::github::GithubClient;
use crate::retry::TokioSleeper;

/// CLI for move-dataset: build fine-tuning datasets from Move repositories.
#[derive(Parser)]
#[clap(
    name = "move-dataset",
    version,
    about = "Build prompt/completion JSONL fine-tuning datasets from Move repositories on GitHub"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl the configured repository and write the JSONL dataset.
    /// Configuration comes from the environment (PROJECT_ID,
    /// ANTHROPIC_API_KEY), not from flags.
    Build,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let result = match cli.command {
        Commands::Build => {
            let config = Config::from_env()?;
            tracing::info!(
                command = "build",
                repository = %config.repository,
                "Starting dataset build"
            );
            let repo = GithubClient::new(config.repository.clone())?;
            let generator = AnthropicGenerator::new(config.api_key.clone());
            match build_dataset(&config, &repo, &generator, &TokioSleeper).await {
                Ok(report) => {
                    tracing::info!(command = "build", ?report, "Dataset build complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "build", error = %e, "Dataset build failed");
                    Err(anyhow::Error::msg(e))
                }
            }
        }
    };

    result
}
