//! High-level pipeline: list repository files, resolve a prompt for each,
//! and append prompt/completion records to a line-delimited JSON file.
//!
//! Failure semantics, in order of appearance:
//!   - Listing failure is soft: the run continues with zero files and the
//!     output file is still created (empty).
//!   - A failed content fetch skips that file; no record is written.
//!   - Rate-limit exhaustion during generation skips that file.
//!   - Any other generation failure, and any output-file I/O failure,
//!     aborts the run. Records written so far remain valid JSONL.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::generate::PromptGenerator;
use crate::github::RepoClient;
use crate::prompt::{resolve_prompt, strip_license, PromptError};
use crate::retry::{RetryPolicy, Sleeper};

/// File extension selecting which repository files become dataset records.
pub const MOVE_EXTENSION: &str = ".move";

/// One persisted training example: the instruction side and the expected
/// code side. Serialized as a single JSON object per output line.
#[derive(Debug, Serialize)]
pub struct DatasetRecord<'a> {
    pub prompt: &'a str,
    pub completion: &'a str,
}

/// Summary of one dataset build, printed by the CLI after the run.
#[derive(Debug)]
pub struct DatasetReport {
    pub output_file: PathBuf,
    pub files_listed: usize,
    pub records_written: usize,
    pub files_skipped: usize,
}

/// Runs the whole pipeline for the configured repository. Strictly
/// sequential: one file at a time, in listing order.
pub async fn build_dataset<R, G, S>(
    config: &Config,
    repo: &R,
    generator: &G,
    sleeper: &S,
) -> Result<DatasetReport, String>
where
    R: RepoClient,
    G: PromptGenerator,
    S: Sleeper,
{
    info!(repository = %config.repository, "Starting dataset build");

    let files = match repo.list_files(MOVE_EXTENSION).await {
        Ok(files) => files,
        Err(e) => {
            error!(
                error = %e,
                repository = %config.repository,
                "Failed to fetch repository tree"
            );
            Vec::new()
        }
    };

    let mut output = match File::create(&config.output_file) {
        Ok(file) => file,
        Err(e) => {
            error!(
                error = ?e,
                path = %config.output_file.display(),
                "Failed to create output file"
            );
            return Err(format!(
                "Failed to create output file {}: {}",
                config.output_file.display(),
                e
            ));
        }
    };

    let policy = RetryPolicy::default();
    let mut records_written = 0;
    let mut files_skipped = 0;

    for path in &files {
        let code = match repo.fetch_file(path).await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %e, path = %path, "Failed to fetch file content, skipping");
                files_skipped += 1;
                continue;
            }
        };

        let completion = strip_license(&code);
        let prompt = match resolve_prompt(&code, &completion, generator, sleeper, policy).await {
            Ok(prompt) => prompt,
            Err(PromptError::RetriesExhausted { attempts }) => {
                warn!(
                    path = %path,
                    attempts = attempts,
                    "Failed to generate prompt after retries, skipping this file"
                );
                files_skipped += 1;
                continue;
            }
            Err(e) => {
                error!(error = %e, path = %path, "Prompt generation failed");
                return Err(format!("Prompt generation failed for {path}: {e}"));
            }
        };

        let record = DatasetRecord {
            prompt: &prompt,
            completion: &completion,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| format!("Failed to serialize record for {path}: {e}"))?;
        if let Err(e) = writeln!(output, "{line}") {
            error!(
                error = ?e,
                path = %config.output_file.display(),
                "Failed to write record"
            );
            return Err(format!(
                "Failed to write record to {}: {}",
                config.output_file.display(),
                e
            ));
        }
        records_written += 1;
        info!(path = %path, "Wrote dataset record");
    }

    info!(
        records = records_written,
        skipped = files_skipped,
        output_file = %config.output_file.display(),
        "JSONL dataset created"
    );

    Ok(DatasetReport {
        output_file: config.output_file.clone(),
        files_listed: files.len(),
        records_written,
        files_skipped,
    })
}
