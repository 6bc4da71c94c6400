//! Adapter for the description-generation service (Anthropic Messages API).
//!
//! The service is consumed through a single operation: given a blob of Move
//! code, return a generated natural-language description. The response
//! payload has been observed in three shapes (a bare string, a sequence of
//! text blocks, a single text block); [`GenerationPayload`] collapses all of
//! them to plain text at this boundary so callers only ever handle text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Model used for prompt generation.
pub const MODEL: &str = "claude-3-haiku-20240307";

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;

/// Error type for the generation service.
#[derive(Debug)]
pub enum GenerateError {
    /// The service signalled that the allowed request rate was exceeded.
    /// The caller should back off and retry.
    RateLimited,
    /// Any other non-success response from the service.
    Api { status: u16, body: String },
    /// Transport-level failure (connection, TLS, body decode).
    Http(reqwest::Error),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::RateLimited => write!(f, "generation rate limit exceeded"),
            GenerateError::Api { status, body } => {
                write!(f, "generation API returned status {status}: {body}")
            }
            GenerateError::Http(e) => write!(f, "http request failed: {e}"),
        }
    }
}

impl std::error::Error for GenerateError {}

impl From<reqwest::Error> for GenerateError {
    fn from(e: reqwest::Error) -> Self {
        GenerateError::Http(e)
    }
}

/// Produces a natural-language description for a blob of source code.
/// Implementations must hand back plain text; any payload-shape handling
/// stays behind this trait.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PromptGenerator: Send + Sync {
    async fn generate(&self, code: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
struct ContentPart<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

/// Payload shapes the service has been observed to return. Deserialization
/// picks whichever shape matches; [`GenerationPayload::into_text`] is the
/// single normalization point.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GenerationPayload {
    Text(String),
    Block(TextBlock),
    Blocks(Vec<TextBlock>),
}

/// One keyed text fragment inside a structured payload.
#[derive(Debug, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl GenerationPayload {
    /// Collapse the payload to plain text. A sequence contributes its first
    /// block; an empty sequence normalizes to the empty string.
    pub fn into_text(self) -> String {
        match self {
            GenerationPayload::Text(text) => text,
            GenerationPayload::Block(block) => block.text,
            GenerationPayload::Blocks(blocks) => blocks
                .into_iter()
                .next()
                .map(|block| block.text)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: GenerationPayload,
}

/// Anthropic Messages API implementation of [`PromptGenerator`].
pub struct AnthropicGenerator {
    http: reqwest::Client,
    api_key: String,
}

impl AnthropicGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        AnthropicGenerator {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn instruction(code: &str) -> String {
        format!(
            "Please summarize the following Move code and generate a concise prompt in English that describes what the code does:\n\n<code>\n{code}\n</code>\n\nProvide your summary and prompt in English, and enclose the prompt inside <prompt> tags."
        )
    }
}

#[async_trait]
impl PromptGenerator for AnthropicGenerator {
    async fn generate(&self, code: &str) -> Result<String, GenerateError> {
        let instruction = Self::instruction(code);
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            messages: vec![Message {
                role: "user",
                content: vec![ContentPart {
                    kind: "text",
                    text: &instruction,
                }],
            }],
        };

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(status = %status, "Generation API rate limit hit");
            return Err(GenerateError::RateLimited);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to decode response body>"));
            error!(status = %status, "Generation API returned error. Response body: {body}");
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let message: MessagesResponse = response.json().await?;
        debug!(payload = ?message.content, "Raw generation response");

        let text = message.content.into_text();
        debug!(text = %text, "Normalized generation response text");
        Ok(text)
    }
}
