//! LM Studio provider.
//!
//! A self-hosted OpenAI-compatible server. The endpoint comes from
//! configuration; the API key is a fixed placeholder the server ignores.

use crate::llms::credentials::Credentials;
use crate::llms::providers::openai::OpenAICompletion;
use crate::utilities::errors::CrewError;

/// Key sent to LM Studio servers.
pub const LM_STUDIO_API_KEY: &str = "lm-studio";

/// Build an LM Studio backend. The credentials must carry a base URL.
pub fn lm_studio_completion(
    model: &str,
    temperature: Option<f64>,
    credentials: Credentials,
) -> Result<OpenAICompletion, CrewError> {
    let base = credentials
        .base_url
        .clone()
        .ok_or_else(|| CrewError::configuration("LM Studio requires an endpoint base URL"))?;
    OpenAICompletion::new("LM Studio", model, temperature, credentials, &base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_base_url() {
        let err = lm_studio_completion("local-model", None, Credentials::default()).unwrap_err();
        assert!(matches!(err, CrewError::Configuration(_)));

        let llm = lm_studio_completion(
            "local-model",
            None,
            Credentials::new(
                Some(LM_STUDIO_API_KEY.into()),
                Some("http://localhost:1234/v1".into()),
            ),
        )
        .unwrap();
        assert_eq!(llm.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
