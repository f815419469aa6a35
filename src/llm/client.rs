/// Blocking client for Ollama-compatible text generation endpoints.
///
/// This module provides `OllamaClient` together with the `LlmClient` trait the
/// term oracle depends on, the error type shared by all clients and the retry
/// policy applied to transient failures.
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Errors that can occur when calling a language model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The endpoint answered with a body the client could not use
    #[error("Model API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl LlmError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LlmError::Timeout(error)
        } else {
            LlmError::Network(error)
        }
    }

    /// Returns `true` for failures worth retrying: network errors, timeouts
    /// and HTTP 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::Http { status } => (500..600).contains(status),
            LlmError::Api { .. } | LlmError::InvalidUrl(_) => false,
        }
    }
}

/// Text generation backend used by the term oracle.
///
/// Implemented by [`OllamaClient`] and by test doubles.
pub trait LlmClient: Send + Sync {
    /// Sends `prompt` to `model` and returns the generated text.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Delays applied between attempts after a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// Retries once per delay, sleeping the given duration before each retry.
    pub fn with_delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn max_retries(&self) -> usize {
        self.delays.len()
    }

    /// Runs `f`, retrying transient errors according to this policy.
    ///
    /// Non-transient errors are returned immediately. When every retry fails
    /// the last error is returned.
    pub fn run<F, T>(&self, mut f: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Result<T, LlmError>,
    {
        let mut last_error = match f() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        for (attempt, delay) in self.delays.iter().enumerate() {
            warn!(
                error = %last_error,
                retry = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "transient model error, retrying"
            );
            thread::sleep(*delay);

            match f() {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }
}

impl Default for RetryPolicy {
    /// Three retries with exponential backoff: 1s, 2s, 4s.
    fn default() -> Self {
        Self::with_delays([1, 2, 4].map(Duration::from_secs))
    }
}

/// Builder for constructing `OllamaClient` instances.
///
/// # Examples
///
/// ```
/// use taxo::llm::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("gemma3:4b")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.model(), "gemma3:4b");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    retry: Option<RetryPolicy>,
}

impl OllamaClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL (e.g., "http://localhost:11434").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the default model name (e.g., "gemma3:4b").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the retry policy used for generation requests.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Builds the `OllamaClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, `OLLAMA_HOST` is used, falling back to
    /// `http://localhost:11434`. If `model()` was not called, `OLLAMA_MODEL`
    /// is used, falling back to an empty string.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidUrl` if the base URL does not parse, or
    /// `LlmError::Network` if the HTTP client cannot be created.
    pub fn build(self) -> Result<OllamaClient, LlmError> {
        let base_url = self.base_url.unwrap_or_else(|| {
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
        });
        let model = self
            .model
            .unwrap_or_else(|| std::env::var("OLLAMA_MODEL").unwrap_or_default());

        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(LlmError::Network)?;

        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Synchronous HTTP client for the Ollama API.
///
/// Should be constructed using `OllamaClientBuilder`.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OllamaClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the default model configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Lists available models from `/api/tags`, largest first.
    pub fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(LlmError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(LlmError::Http {
                status: response.status().as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(LlmError::from_reqwest)?;
        Ok(model_names_by_size(&json))
    }

    fn generate_once(&self, url: &str, body: &serde_json::Value) -> Result<String, LlmError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(LlmError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(LlmError::from_reqwest)?;
        response_text(&json)
    }
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let model = if model.is_empty() {
            self.model.as_str()
        } else {
            model
        };
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false
        });

        debug!(%url, model, prompt_len = prompt.len(), "sending generate request");
        self.retry.run(|| self.generate_once(&url, &body))
    }
}

/// Extracts the `response` field of an `/api/generate` reply.
fn response_text(json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(message) = json.get("error").and_then(|v| v.as_str()) {
        return Err(LlmError::Api {
            message: message.to_string(),
        });
    }

    json.get("response")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::Api {
            message: "Missing 'response' field in API response".to_string(),
        })
}

/// Extracts model names from an `/api/tags` reply, sorted by size descending.
fn model_names_by_size(json: &serde_json::Value) -> Vec<String> {
    let mut models: Vec<(String, u64)> = json
        .get("models")
        .and_then(|m| m.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|model| {
                    let name = model.get("name").and_then(|n| n.as_str())?;
                    let size = model.get("size").and_then(|s| s.as_u64()).unwrap_or(0);
                    Some((name.to_string(), size))
                })
                .collect()
        })
        .unwrap_or_default();

    models.sort_by(|a, b| b.1.cmp(&a.1));
    models.into_iter().map(|(name, _)| name).collect()
}
