use anyhow::Result;
use std::path::PathBuf;
use tracing::{error, info};

/// Process-wide configuration, loaded once at startup and passed explicitly
/// to each component. Secrets come from the environment (a `.env` file is
/// honoured by the binary before this runs).
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository identifier in `owner/name` form.
    pub repository: String,
    /// API key for the prompt-generation service.
    pub api_key: String,
    /// Where the JSONL dataset is written, derived from the repository name.
    pub output_file: PathBuf,
}

impl Config {
    /// Reads all required variables from the environment. A missing variable
    /// is fatal: without a repository identifier there is no output filename
    /// to derive, and without a key no prompts can be generated.
    pub fn from_env() -> Result<Self> {
        let repository = match std::env::var("PROJECT_ID") {
            Ok(repo) => repo,
            Err(e) => {
                error!(error = ?e, "PROJECT_ID environment variable not set");
                return Err(anyhow::anyhow!(
                    "PROJECT_ID environment variable not set: {e}"
                ));
            }
        };

        let api_key = match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) => {
                info!("ANTHROPIC_API_KEY found in env");
                key
            }
            Err(e) => {
                error!(error = ?e, "ANTHROPIC_API_KEY environment variable not set");
                return Err(anyhow::anyhow!(
                    "ANTHROPIC_API_KEY environment variable not set: {e}"
                ));
            }
        };

        let output_file = PathBuf::from(output_filename(&repository));

        info!(
            repository = %repository,
            output_file = %output_file.display(),
            "Config loaded from environment"
        );

        Ok(Config {
            repository,
            api_key,
            output_file,
        })
    }
}

/// Deterministic output filename for a repository: the `owner/name`
/// separator becomes `-`, followed by a fixed suffix.
pub fn output_filename(repository: &str) -> String {
    format!("{}_dataset.jsonl", repository.replace('/', "-"))
}
