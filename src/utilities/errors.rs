//! Error types for the planner crew.
//!
//! Configuration and credential errors are run-fatal and surface before any
//! backend call. Delegation-depth and backend errors are task- or
//! delegation-scoped and are recorded in the execution trace instead.

use std::time::Duration;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CrewError>;

/// Top-level error for provider resolution, crew construction and runs.
#[derive(Debug, Error)]
pub enum CrewError {
    /// Bad selector, unknown provider, missing manager rights, dangling role
    /// or task reference.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A provider's required credential is missing or empty.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The manager kept delegating past the configured bound.
    #[error(transparent)]
    DelegationDepthExceeded(#[from] DelegationDepthExceeded),

    /// Network, timeout or provider-side failure after retries.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The caller cancelled the run.
    #[error("run cancelled")]
    Cancelled,

    /// Anything not classified above. The original cause is kept in the chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CrewError {
    /// Shorthand for a [`CrewError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error must abort the whole run.
    pub fn is_run_fatal(&self) -> bool {
        !matches!(self, Self::DelegationDepthExceeded(_) | Self::Backend(_))
    }
}

/// A required credential could not be resolved for a provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{provider} credential `{key}` is not set or empty")]
pub struct CredentialError {
    /// Provider name as written in the selector.
    pub provider: String,
    /// Configuration key that was looked up.
    pub key: String,
}

impl CredentialError {
    pub fn new(provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            key: key.into(),
        }
    }
}

/// The manager hit the delegation bound without producing a final answer.
#[derive(Debug, Clone, Error)]
#[error("task '{task}' exceeded the delegation depth bound of {bound} rounds")]
pub struct DelegationDepthExceeded {
    /// Task key.
    pub task: String,
    /// Configured bound.
    pub bound: usize,
    /// Results collected before the bound was hit.
    pub partial_results: Vec<String>,
}

/// Failure of a single backend completion call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The provider answered with a non-success status.
    #[error("{provider} API error ({status}): {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// The provider throttled the request (HTTP 429).
    #[error("{provider} rate limited the request")]
    RateLimited { provider: String },

    /// Connection-level failure.
    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    /// No response within the configured timeout.
    #[error("{provider} request timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    /// The response could not be interpreted.
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl BackendError {
    /// Whether a retry with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::InvalidResponse { .. } => false,
        }
    }

    /// Map a `reqwest` failure into the backend taxonomy.
    pub fn from_reqwest(provider: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
                timeout,
            }
        } else {
            Self::Transport {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }
}
