/// Language model client module.
///
/// This module provides a blocking HTTP client for Ollama-compatible
/// endpoints, including error handling, retry logic, and timeout configuration.
mod client;

pub use client::{LlmClient, LlmError, OllamaClient, OllamaClientBuilder, RetryPolicy};
