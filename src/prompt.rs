//! Prompt resolution and license stripping.
//!
//! A file's prompt comes from one of two places: an author-supplied
//! `/// @prompt` marker inside the file, or the generation service asked to
//! describe the code. The marker always wins and costs no external call.

use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::generate::{GenerateError, PromptGenerator};
use crate::retry::{RetryPolicy, Sleeper};

/// Delay observed before every generation request, to stay under the
/// service's request rate.
pub const PRE_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Looks for a `/// @prompt ...` marker and returns the trailing text of
/// that line, trimmed.
pub fn extract_marker_prompt(code: &str) -> Option<String> {
    let pattern = Regex::new(r"///\s*@prompt\s*(.*)").unwrap();
    pattern
        .captures(code)
        .map(|caps| caps[1].trim().to_string())
}

/// Pulls the text between `<prompt>` tags out of a generation response,
/// trimmed. The tag may span multiple lines.
pub fn extract_tagged_prompt(response: &str) -> Option<String> {
    let pattern = Regex::new(r"(?s)<prompt>(.*?)</prompt>").unwrap();
    pattern
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
}

/// Drops a leading license header: everything before the first line that
/// starts with the `module` keyword. Without such a line the text is
/// returned trimmed, with no header assumed.
pub fn strip_license(code: &str) -> String {
    let lines: Vec<&str> = code.split('\n').collect();
    match lines.iter().position(|line| line.starts_with("module")) {
        Some(index) => lines[index..].join("\n").trim().to_string(),
        None => code.trim().to_string(),
    }
}

/// Error type for prompt resolution.
#[derive(Debug)]
pub enum PromptError {
    /// Every attempt hit the rate limit; the caller should skip this file
    /// and move on.
    RetriesExhausted { attempts: u32 },
    /// The generation service failed in a way retrying does not address.
    Generate(GenerateError),
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptError::RetriesExhausted { attempts } => {
                write!(f, "failed to generate prompt after {attempts} attempts")
            }
            PromptError::Generate(e) => write!(f, "prompt generation failed: {e}"),
        }
    }
}

impl std::error::Error for PromptError {}

/// Resolves the prompt for one file.
///
/// `code` is the raw file text (scanned for the marker); `completion` is the
/// license-stripped text handed to the generator when no marker exists.
/// Rate-limit signals are retried under `policy`, waiting `backoff(attempt)`
/// between attempts.
pub async fn resolve_prompt<G, S>(
    code: &str,
    completion: &str,
    generator: &G,
    sleeper: &S,
    policy: RetryPolicy,
) -> Result<String, PromptError>
where
    G: PromptGenerator,
    S: Sleeper,
{
    if let Some(prompt) = extract_marker_prompt(code) {
        debug!(prompt = %prompt, "Extracted prompt from @prompt marker");
        return Ok(prompt);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        sleeper.sleep(PRE_REQUEST_DELAY).await;
        match generator.generate(completion).await {
            Ok(response) => {
                return Ok(match extract_tagged_prompt(&response) {
                    Some(prompt) => prompt,
                    None => {
                        warn!(
                            "No <prompt> tag found in generation response. Using the entire response as the prompt."
                        );
                        response
                    }
                });
            }
            Err(GenerateError::RateLimited) if policy.should_retry(attempt) => {
                let backoff = policy.backoff(attempt);
                warn!(
                    attempt = attempt,
                    backoff_secs = backoff.as_secs(),
                    "Rate limit exceeded, retrying after backoff"
                );
                sleeper.sleep(backoff).await;
            }
            Err(GenerateError::RateLimited) => {
                warn!(attempts = attempt, "Rate limit retries exhausted");
                return Err(PromptError::RetriesExhausted { attempts: attempt });
            }
            Err(e) => return Err(PromptError::Generate(e)),
        }
    }
}
