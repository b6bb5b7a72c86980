//! AI provider adapter port.
//!
//! The orchestrator talks to one operation: `call(request) -> response`.
//! A provider failure the caller can reason about (timeout, upstream
//! error) is carried in the response `error` field; transport-level
//! failures surface as [`ProviderError`]. Either way the orchestrator
//! degrades to rule-only analysis.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicProvider;

/// Errors from AI providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// A prompt-in request to the AI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl AiRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Structured-output-out response from the AI collaborator.
///
/// `parsed` is filled when the raw content parsed as JSON; `error` is
/// non-empty when the provider failed in a way the analysis should treat
/// as "no signal" (including timeouts).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiResponse {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiResponse {
    /// A response representing a degraded call (timeout, upstream error).
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_usable(&self) -> bool {
        self.error.is_none() && !self.raw.is_empty()
    }
}

/// Provider abstraction; swapping AI backends means swapping this.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Execute one prompt. Degradable failures (timeouts, upstream
    /// errors) are reported through the response `error` field rather
    /// than `Err`.
    async fn call(&self, request: &AiRequest) -> Result<AiResponse, ProviderError>;

    /// Provider name for logs and metrics.
    fn name(&self) -> &str;

    /// Whether the provider is ready to serve calls.
    async fn health_check(&self) -> bool;
}
