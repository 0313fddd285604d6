//! OpenAI chat-completions provider.
//!
//! Speaks the `/chat/completions` wire format. Groq and LM Studio expose the
//! same API and reuse this backend with a different base URL.

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{BaseLLM, BaseLLMState, LLMMessage};
use crate::llms::credentials::Credentials;
use crate::utilities::errors::{BackendError, CrewError};

/// Default OpenAI endpoint.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Backend for any OpenAI-compatible chat-completions endpoint.
#[derive(Debug)]
pub struct OpenAICompletion {
    pub state: BaseLLMState,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAICompletion {
    /// Create a backend for `provider` rooted at `default_base` unless the
    /// credentials carry their own base URL.
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        temperature: Option<f64>,
        credentials: Credentials,
        default_base: &str,
    ) -> Result<Self, CrewError> {
        let endpoint = format!("{}/chat/completions", credentials.base_url_or(default_base));
        let state = BaseLLMState::new(provider, model, temperature, credentials);
        let client = state.http_client()?;
        Ok(Self {
            state,
            endpoint,
            client,
        })
    }

    /// Endpoint requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[LLMMessage]) -> Value {
        let mut body = serde_json::json!({
            "model": self.state.model,
            "messages": messages,
        });
        if let Some(temp) = self.state.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = self.state.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    /// Extract `choices[0].message.content`.
    pub fn parse_response(&self, response: &Value) -> Result<String, BackendError> {
        let message = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| self.state.invalid_response("no choices in response"))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "{} token usage: prompt={}, completion={}, total={}",
                self.state.provider,
                usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            );
        }

        Ok(message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn provider(&self) -> &str {
        &self.state.provider
    }

    fn model(&self) -> &str {
        &self.state.model
    }

    fn temperature(&self) -> Option<f64> {
        self.state.temperature
    }

    async fn complete(&self, messages: &[LLMMessage]) -> Result<String, BackendError> {
        log::debug!(
            "{} completion: model={}, messages={}",
            self.state.provider,
            self.state.model,
            messages.len(),
        );

        let body = self.build_request_body(messages);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .bearer_auth(self.state.credentials.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.state.transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.state.transport_error(e))?;
        if !status.is_success() {
            return Err(self.state.status_error(status, &text));
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            self.state.invalid_response(format!(
                "failed to parse response: {} - body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })?;
        self.parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OpenAICompletion {
        OpenAICompletion::new(
            "OpenAI",
            "gpt-4o-mini",
            Some(0.1),
            Credentials::new(Some("sk-test".into()), None),
            OPENAI_API_BASE,
        )
        .unwrap()
    }

    #[test]
    fn test_request_body() {
        let llm = backend();
        let body = llm.build_request_body(&[LLMMessage::system("sys"), LLMMessage::user("hi")]);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.1);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("max_tokens").is_none());
        assert_eq!(llm.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_parse_response() {
        let llm = backend();
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Plan ready"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        });
        assert_eq!(llm.parse_response(&json).unwrap(), "Plan ready");

        let err = llm.parse_response(&serde_json::json!({"choices": []})).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }

    #[test]
    fn test_custom_base_url() {
        let llm = OpenAICompletion::new(
            "OpenAI",
            "gpt-4o",
            None,
            Credentials::new(Some("k".into()), Some("http://proxy.local/v1/".into())),
            OPENAI_API_BASE,
        )
        .unwrap();
        assert_eq!(llm.endpoint(), "http://proxy.local/v1/chat/completions");
        assert_eq!(llm.fingerprint(), "OpenAI:gpt-4o");
    }
}
