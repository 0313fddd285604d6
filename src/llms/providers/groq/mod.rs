//! Groq provider.
//!
//! Groq serves an OpenAI-compatible API, so this is the chat-completions
//! backend pointed at Groq's endpoint.

use crate::llms::credentials::Credentials;
use crate::llms::providers::openai::OpenAICompletion;
use crate::utilities::errors::CrewError;

/// Groq API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Build a Groq backend.
pub fn groq_completion(
    model: &str,
    temperature: Option<f64>,
    credentials: Credentials,
) -> Result<OpenAICompletion, CrewError> {
    OpenAICompletion::new("Groq", model, temperature, credentials, GROQ_API_BASE)
}
