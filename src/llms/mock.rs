//! Offline backend for tests and dry runs.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llms::base_llm::{BaseLLM, LLMMessage};
use crate::utilities::errors::BackendError;

type Responder = dyn Fn(&[LLMMessage]) -> Result<String, BackendError> + Send + Sync;

enum MockMode {
    Fixed(String),
    Scripted(Mutex<VecDeque<Result<String, BackendError>>>),
    Responder(Arc<Responder>),
}

/// Backend returning canned text.
///
/// Every `complete` call bumps a shared counter, so tests can assert how many
/// requests actually reached the backend.
pub struct MockLLM {
    model: String,
    mode: MockMode,
    calls: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MockLLM {
    /// Always answer `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_mode(MockMode::Fixed(text.into()))
    }

    /// Answer from a script, one entry per call. An exhausted script fails
    /// with an invalid-response error.
    pub fn scripted(responses: Vec<Result<String, BackendError>>) -> Self {
        Self::with_mode(MockMode::Scripted(Mutex::new(responses.into())))
    }

    /// Compute each answer from the request messages.
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&[LLMMessage]) -> Result<String, BackendError> + Send + Sync + 'static,
    {
        Self::with_mode(MockMode::Responder(Arc::new(f)))
    }

    fn with_mode(mode: MockMode) -> Self {
        Self {
            model: "mock".to_string(),
            mode,
            calls: Arc::new(AtomicUsize::new(0)),
            latency: None,
        }
    }

    /// Sleep this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Handle to the call counter; stays valid after the backend is moved
    /// into an agent.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockLLM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            MockMode::Fixed(_) => "fixed",
            MockMode::Scripted(_) => "scripted",
            MockMode::Responder(_) => "responder",
        };
        f.debug_struct("MockLLM")
            .field("model", &self.model)
            .field("mode", &mode)
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl BaseLLM for MockLLM {
    fn provider(&self) -> &str {
        "Mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> Option<f64> {
        None
    }

    async fn complete(&self, messages: &[LLMMessage]) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.mode {
            MockMode::Fixed(text) => Ok(text.clone()),
            MockMode::Scripted(script) => script.lock().pop_front().unwrap_or_else(|| {
                Err(BackendError::InvalidResponse {
                    provider: "Mock".to_string(),
                    message: "script exhausted".to_string(),
                })
            }),
            MockMode::Responder(f) => f(messages),
        }
    }
}
