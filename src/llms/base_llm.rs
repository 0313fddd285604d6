//! Completion backend abstraction.
//!
//! Every provider implements [`BaseLLM`]. A backend is built once per run by
//! the provider registry and owned by exactly one agent; it keeps no mutable
//! state, so `complete` takes `&self` and may be called concurrently.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llms::credentials::Credentials;
use crate::utilities::errors::BackendError;

/// Default request timeout for HTTP backends.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A single chat message sent to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LLMMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Callable text-completion backend.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Provider name as registered (e.g. "OpenAI").
    fn provider(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Sampling temperature, if the backend uses one.
    fn temperature(&self) -> Option<f64>;

    /// Run one completion and return the raw text.
    ///
    /// Implementations make a single attempt; retry and backoff belong to the
    /// crew's invocation layer.
    async fn complete(&self, messages: &[LLMMessage]) -> Result<String, BackendError>;

    /// Identity of the backend configuration, used in cache keys so entries
    /// from a differently configured backend are never replayed.
    fn fingerprint(&self) -> String {
        match self.temperature() {
            Some(t) => format!("{}:{}:{}", self.provider(), self.model(), t),
            None => format!("{}:{}", self.provider(), self.model()),
        }
    }
}

/// Shared state for HTTP-backed providers.
#[derive(Debug, Clone)]
pub struct BaseLLMState {
    /// Provider name as registered.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Credentials resolved for this backend only.
    pub credentials: Credentials,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Upper bound on generated tokens, when the API needs one.
    pub max_tokens: Option<u32>,
}

impl BaseLLMState {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        temperature: Option<f64>,
        credentials: Credentials,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature,
            credentials,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: None,
        }
    }

    /// Build the HTTP client for this backend.
    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }

    /// Map a non-success HTTP status into a [`BackendError`].
    pub fn status_error(&self, status: reqwest::StatusCode, body: &str) -> BackendError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return BackendError::RateLimited {
                provider: self.provider.clone(),
            };
        }
        BackendError::Http {
            provider: self.provider.clone(),
            status: status.as_u16(),
            message: body.chars().take(500).collect(),
        }
    }

    /// Shorthand for a malformed-response error.
    pub fn invalid_response(&self, message: impl Into<String>) -> BackendError {
        BackendError::InvalidResponse {
            provider: self.provider.clone(),
            message: message.into(),
        }
    }

    /// Shorthand for a transport-level error.
    pub fn transport_error(&self, err: reqwest::Error) -> BackendError {
        BackendError::from_reqwest(&self.provider, self.timeout, err)
    }
}
