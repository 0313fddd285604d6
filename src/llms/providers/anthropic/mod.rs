//! Anthropic Messages API provider.
//!
//! Anthropic takes system prompts as a separate `system` field, so system
//! messages are pulled out of the conversation before the request is sent.

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{BaseLLM, BaseLLMState, LLMMessage};
use crate::llms::credentials::Credentials;
use crate::utilities::errors::{BackendError, CrewError};

/// Default Anthropic endpoint.
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Backend for the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicCompletion {
    pub state: BaseLLMState,
    endpoint: String,
    client: reqwest::Client,
}

impl AnthropicCompletion {
    pub fn new(
        model: impl Into<String>,
        temperature: Option<f64>,
        credentials: Credentials,
    ) -> Result<Self, CrewError> {
        let endpoint = format!("{}/v1/messages", credentials.base_url_or(ANTHROPIC_API_BASE));
        let mut state = BaseLLMState::new("Anthropic", model, temperature, credentials);
        state.max_tokens = Some(DEFAULT_MAX_TOKENS);
        let client = state.http_client()?;
        Ok(Self {
            state,
            endpoint,
            client,
        })
    }

    /// Split system messages from the conversation. Multiple system messages
    /// are joined with a blank line.
    fn extract_system_and_messages(messages: &[LLMMessage]) -> (Option<String>, Vec<Value>) {
        let mut system_parts = Vec::new();
        let mut formatted = Vec::new();
        for message in messages {
            if message.role == "system" {
                system_parts.push(message.content.clone());
            } else {
                formatted.push(serde_json::json!({
                    "role": message.role,
                    "content": message.content,
                }));
            }
        }
        let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));
        (system, formatted)
    }

    /// Build the request body for the Messages API.
    pub fn build_request_body(&self, messages: &[LLMMessage]) -> Value {
        let (system, formatted) = Self::extract_system_and_messages(messages);
        let mut body = serde_json::json!({
            "model": self.state.model,
            "messages": formatted,
            "max_tokens": self.state.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if let Some(temp) = self.state.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    /// Concatenate the `text` blocks of the response content.
    pub fn parse_response(&self, response: &Value) -> Result<String, BackendError> {
        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| self.state.invalid_response("no content in response"))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "Anthropic token usage: input={}, output={}",
                usage.get("input_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("output_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            );
        }

        Ok(blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl BaseLLM for AnthropicCompletion {
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
            "Anthropic completion: model={}, messages={}",
            self.state.model,
            messages.len()
        );

        let body = self.build_request_body(messages);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("x-api-key", self.state.credentials.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| self.state.invalid_response(format!("failed to parse response: {}", e)))?;
        self.parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> AnthropicCompletion {
        AnthropicCompletion::new(
            "claude-3-5-sonnet",
            Some(0.2),
            Credentials::new(Some("sk-ant-test".into()), None),
        )
        .unwrap()
    }

    #[test]
    fn test_build_request_body_with_system() {
        let llm = backend();
        let body = llm.build_request_body(&[
            LLMMessage::system("System 1."),
            LLMMessage::system("System 2."),
            LLMMessage::user("Plan the pilot."),
        ]);
        assert_eq!(body["system"], "System 1.\n\nSystem 2.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(llm.endpoint, "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_parse_response_text_blocks() {
        let llm = backend();
        let json = serde_json::json!({
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": " world"}
            ],
            "usage": {"input_tokens": 4, "output_tokens": 2}
        });
        assert_eq!(llm.parse_response(&json).unwrap(), "Hello world");
        assert!(llm.parse_response(&serde_json::json!({})).is_err());
    }
}
