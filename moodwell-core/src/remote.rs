//! Remote model client: alternate reply source backed by a generative-language API
//!
//! Provides a `ModelClient` trait with:
//! - **Gemini**: `generateContent` over HTTPS, one call per `complete()`
//! - **Retrying**: caller-supplied wrapper adding exponential backoff for
//!   transport failures and 429/5xx responses
//!
//! The plain client never retries and keeps no state between calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::RemoteConfig;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// ============================================================================
// ModelClient trait
// ============================================================================

/// Abstraction over remote text-generation services.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError>;

    /// Client name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network, DNS or TLS failure, or the request timed out.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Response contained no usable candidate text")]
    EmptyResponse,

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Missing API key")]
    MissingApiKey,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

impl RemoteError {
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::Transport(_) => "transport",
            RemoteError::Upstream { .. } => "upstream",
            RemoteError::EmptyResponse => "empty_response",
            RemoteError::EmptyPrompt => "invalid_input",
            RemoteError::MissingApiKey => "config",
        }
    }

    /// Transport failures, rate limiting and server errors may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl From<&RemoteConfig> for GeminiConfig {
    fn from(c: &RemoteConfig) -> Self {
        Self {
            api_key: c.resolved_api_key(),
            model: c.model.clone(),
            base_url: c.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(c.timeout_seconds),
        }
    }
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// First candidate's first non-blank text part.
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .find(|t| !t.trim().is_empty())
    }
}

// ============================================================================
// GeminiModelClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiModelClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiModelClient {
    pub fn new(config: GeminiConfig) -> Result<Self, RemoteError> {
        if config.api_key.is_empty() {
            return Err(RemoteError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    async fn send(&self, prompt: &str) -> Result<String, RemoteError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Generative API error");
            return Err(RemoteError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Generative API returned malformed payload");
                return Err(RemoteError::EmptyResponse);
            }
        };

        parsed.into_text().ok_or(RemoteError::EmptyResponse)
    }
}

#[async_trait]
impl ModelClient for GeminiModelClient {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError> {
        if prompt.trim().is_empty() {
            return Err(RemoteError::EmptyPrompt);
        }

        match tokio::time::timeout(self.config.timeout, self.send(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Transport(format!(
                "request timed out after {:?}",
                self.config.timeout
            ))),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// RetryingModelClient
// ============================================================================

/// Wraps any `ModelClient` and retries retryable failures with exponential
/// backoff. When attempts run out the last error is returned unchanged.
pub struct RetryingModelClient<C> {
    inner: C,
    max_retries: usize,
    retry_delay_ms: u64,
    name: String,
}

impl<C: ModelClient> RetryingModelClient<C> {
    pub fn new(inner: C, max_retries: usize, retry_delay_ms: u64) -> Self {
        let name = format!("{}+retry", inner.name());
        Self {
            inner,
            max_retries,
            retry_delay_ms,
            name,
        }
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for RetryingModelClient<C> {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries);

        RetryIf::spawn(
            retry_strategy,
            || self.inner.complete(prompt),
            |e: &RemoteError| {
                let retry = e.is_retryable();
                if retry {
                    tracing::warn!(client = self.inner.name(), error = %e, "Retrying model call");
                }
                retry
            },
        )
        .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the configured client: Gemini, wrapped in retries when
/// `max_retries > 0`.
pub fn create_model_client(config: &RemoteConfig) -> Result<Box<dyn ModelClient>, RemoteError> {
    let gemini = GeminiModelClient::new(GeminiConfig::from(config))?;
    if config.max_retries == 0 {
        Ok(Box::new(gemini))
    } else {
        Ok(Box::new(RetryingModelClient::new(
            gemini,
            config.max_retries,
            config.retry_delay_ms,
        )))
    }
}

// ============================================================================
// TESTS
// ============================================================================
