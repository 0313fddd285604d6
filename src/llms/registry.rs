//! Provider registry.
//!
//! Maps a provider name to the credentials it needs and a constructor that
//! builds a backend. `resolve` turns a `"<Provider>: <model>"` selector into
//! a ready backend, failing before any network call when the selector,
//! provider or credentials are wrong.
//!
//! Credentials are read from the injected [`ConfigSource`] on every resolve
//! and passed to exactly one constructor; nothing is written back to shared
//! state, so rotating a key takes effect on the next resolve and one
//! provider's key is never visible to another.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::llms::base_llm::BaseLLM;
use crate::llms::credentials::{ConfigSource, Credentials};
use crate::llms::providers::anthropic::AnthropicCompletion;
use crate::llms::providers::groq::groq_completion;
use crate::llms::providers::lm_studio::{lm_studio_completion, LM_STUDIO_API_KEY};
use crate::llms::providers::openai::{OpenAICompletion, OPENAI_API_BASE};
use crate::utilities::errors::{CredentialError, CrewError, Result};

/// Delimiter between provider and model in a selector.
pub const SELECTOR_DELIMITER: &str = ": ";

/// A parsed provider selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSpec {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
}

impl ProviderSpec {
    /// Parse `"<Provider>: <model>"`. The selector must split into exactly
    /// two non-empty parts.
    pub fn parse(selector: &str, temperature: f64) -> Result<Self> {
        let parts: Vec<&str> = selector.split(SELECTOR_DELIMITER).collect();
        let [provider, model] = parts.as_slice() else {
            return Err(CrewError::configuration(format!(
                "invalid provider selector '{}': expected '<Provider>: <model>'",
                selector
            )));
        };
        let (provider, model) = (provider.trim(), model.trim());
        if provider.is_empty() || model.is_empty() {
            return Err(CrewError::configuration(format!(
                "invalid provider selector '{}': provider and model must be non-empty",
                selector
            )));
        }
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(CrewError::configuration(format!(
                "invalid temperature {} for '{}'",
                temperature, selector
            )));
        }
        Ok(Self {
            provider: provider.to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

/// Where a provider's API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// Configuration key that must hold a non-empty value.
    Required(String),
    /// Constant key, no lookup.
    Fixed(String),
    /// The provider needs no key.
    None,
}

/// Where a provider's endpoint comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrlSource {
    /// Use the constructor's default endpoint.
    Default,
    /// Configuration key that may override the default.
    Optional(String),
    /// Configuration key that must be set; absence is a configuration error.
    Required(String),
}

/// Credentials a provider needs at resolve time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequirements {
    pub api_key: ApiKeySource,
    pub base_url: BaseUrlSource,
}

impl CredentialRequirements {
    /// A provider that needs a single API key.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKeySource::Required(key.into()),
            base_url: BaseUrlSource::Default,
        }
    }

    /// A provider that needs nothing.
    pub fn none() -> Self {
        Self {
            api_key: ApiKeySource::None,
            base_url: BaseUrlSource::Default,
        }
    }

    pub fn with_base_url(mut self, base_url: BaseUrlSource) -> Self {
        self.base_url = base_url;
        self
    }

    /// Look up everything this provider needs.
    pub fn resolve(&self, provider: &str, config: &dyn ConfigSource) -> Result<Credentials> {
        let base_url = match &self.base_url {
            BaseUrlSource::Default => None,
            BaseUrlSource::Optional(key) => config.get_non_empty(key),
            BaseUrlSource::Required(key) => Some(config.get_non_empty(key).ok_or_else(|| {
                CrewError::configuration(format!("{} requires endpoint `{}` to be set", provider, key))
            })?),
        };
        let api_key = match &self.api_key {
            ApiKeySource::Required(key) => Some(
                config
                    .get_non_empty(key)
                    .ok_or_else(|| CredentialError::new(provider, key.as_str()))?,
            ),
            ApiKeySource::Fixed(value) => Some(value.clone()),
            ApiKeySource::None => None,
        };
        Ok(Credentials::new(api_key, base_url))
    }
}

/// Builds a backend from a parsed selector and resolved credentials.
pub type BackendConstructor =
    Arc<dyn Fn(&ProviderSpec, Credentials) -> Result<Box<dyn BaseLLM>> + Send + Sync>;

#[derive(Clone)]
struct ProviderEntry {
    requirements: CredentialRequirements,
    constructor: BackendConstructor,
}

/// Provider name to backend constructor.
#[derive(Clone)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
    config: Arc<dyn ConfigSource>,
}

impl ProviderRegistry {
    /// An empty registry reading credentials from `config`.
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            entries: HashMap::new(),
            config,
        }
    }

    /// A registry with OpenAI, Groq, Anthropic and LM Studio.
    pub fn with_defaults(config: Arc<dyn ConfigSource>) -> Self {
        let mut registry = Self::new(config);
        registry.register(
            "OpenAI",
            CredentialRequirements::api_key("OPENAI_API_KEY")
                .with_base_url(BaseUrlSource::Optional("OPENAI_API_BASE".to_string())),
            Arc::new(|spec: &ProviderSpec, credentials: Credentials| {
                let llm = OpenAICompletion::new(
                    "OpenAI",
                    spec.model.as_str(),
                    Some(spec.temperature),
                    credentials,
                    OPENAI_API_BASE,
                )?;
                Ok(Box::new(llm) as Box<dyn BaseLLM>)
            }),
        );
        registry.register(
            "Groq",
            CredentialRequirements::api_key("GROQ_API_KEY"),
            Arc::new(|spec: &ProviderSpec, credentials: Credentials| {
                let llm = groq_completion(&spec.model, Some(spec.temperature), credentials)?;
                Ok(Box::new(llm) as Box<dyn BaseLLM>)
            }),
        );
        registry.register(
            "Anthropic",
            CredentialRequirements::api_key("ANTHROPIC_API_KEY"),
            Arc::new(|spec: &ProviderSpec, credentials: Credentials| {
                let llm =
                    AnthropicCompletion::new(spec.model.as_str(), Some(spec.temperature), credentials)?;
                Ok(Box::new(llm) as Box<dyn BaseLLM>)
            }),
        );
        registry.register(
            "LM Studio",
            CredentialRequirements {
                api_key: ApiKeySource::Fixed(LM_STUDIO_API_KEY.to_string()),
                base_url: BaseUrlSource::Required("LMSTUDIO_API_BASE".to_string()),
            },
            Arc::new(|spec: &ProviderSpec, credentials: Credentials| {
                let llm = lm_studio_completion(&spec.model, Some(spec.temperature), credentials)?;
                Ok(Box::new(llm) as Box<dyn BaseLLM>)
            }),
        );
        registry
    }

    /// Register or replace a provider.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        requirements: CredentialRequirements,
        constructor: BackendConstructor,
    ) {
        self.entries.insert(
            name.into(),
            ProviderEntry {
                requirements,
                constructor,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a backend for `selector`.
    pub fn resolve(&self, selector: &str, temperature: f64) -> Result<Box<dyn BaseLLM>> {
        let spec = ProviderSpec::parse(selector, temperature)?;
        let entry = self.entries.get(&spec.provider).ok_or_else(|| {
            CrewError::configuration(format!(
                "unsupported provider '{}' (available: {})",
                spec.provider,
                self.providers().join(", ")
            ))
        })?;
        let credentials = entry
            .requirements
            .resolve(&spec.provider, self.config.as_ref())?;
        log::debug!(
            "Resolved provider {} model {} with {:?}",
            spec.provider,
            spec.model,
            credentials
        );
        (entry.constructor)(&spec, credentials)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::credentials::{FnConfig, MapConfig};
    use crate::llms::mock::MockLLM;

    fn registry(config: MapConfig) -> ProviderRegistry {
        ProviderRegistry::with_defaults(Arc::new(config))
    }

    fn full_config() -> MapConfig {
        MapConfig::new()
            .with("OPENAI_API_KEY", "sk-openai-123456")
            .with("GROQ_API_KEY", "gsk_groq_123456")
            .with("ANTHROPIC_API_KEY", "sk-ant-123456")
            .with("LMSTUDIO_API_BASE", "http://localhost:1234/v1")
    }

    #[test]
    fn test_parse_selector() {
        let spec = ProviderSpec::parse("OpenAI: gpt-4o-mini", 0.1).unwrap();
        assert_eq!(spec.provider, "OpenAI");
        assert_eq!(spec.model, "gpt-4o-mini");

        let spec = ProviderSpec::parse("LM Studio: lmstudio-community/Meta-Llama", 0.2).unwrap();
        assert_eq!(spec.provider, "LM Studio");
    }

    #[test]
    fn test_parse_selector_rejects_malformed() {
        for selector in ["OpenAI", "OpenAI:gpt-4o", ": gpt-4o", "OpenAI: ", "A: b: c", ""] {
            let err = ProviderSpec::parse(selector, 0.1).unwrap_err();
            assert!(matches!(err, CrewError::Configuration(_)), "{selector}");
        }
        assert!(ProviderSpec::parse("OpenAI: gpt-4o", f64::NAN).is_err());
    }

    #[test]
    fn test_resolve_all_defaults() {
        let registry = registry(full_config());
        for (selector, provider) in [
            ("OpenAI: gpt-4o-mini", "OpenAI"),
            ("Groq: llama-3.3-70b-versatile", "Groq"),
            ("Anthropic: claude-3-5-sonnet", "Anthropic"),
            ("LM Studio: local-model", "LM Studio"),
        ] {
            let llm = registry.resolve(selector, 0.1).unwrap();
            assert_eq!(llm.provider(), provider);
            assert_eq!(llm.temperature(), Some(0.1));
        }
    }

    #[test]
    fn test_missing_or_empty_credential() {
        let registry = registry(MapConfig::new().with("GROQ_API_KEY", "  "));
        let err = registry.resolve("OpenAI: gpt-4o", 0.1).unwrap_err();
        assert!(matches!(err, CrewError::Credential(ref e) if e.key == "OPENAI_API_KEY"));
        let err = registry.resolve("Groq: llama3", 0.1).unwrap_err();
        assert!(matches!(err, CrewError::Credential(_)));
    }

    #[test]
    fn test_unknown_provider() {
        let err = registry(full_config()).resolve("Mistral: large", 0.1).unwrap_err();
        match err {
            CrewError::Configuration(msg) => assert!(msg.contains("unsupported provider")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lm_studio_missing_endpoint_is_configuration_error() {
        let err = registry(MapConfig::new()).resolve("LM Studio: local", 0.1).unwrap_err();
        assert!(matches!(err, CrewError::Configuration(_)));
    }

    #[test]
    fn test_no_cross_provider_leakage() {
        // only OpenAI is configured; Groq must not pick up its key
        let registry = registry(MapConfig::new().with("OPENAI_API_KEY", "sk-openai-123456"));
        assert!(registry.resolve("OpenAI: gpt-4o", 0.1).is_ok());
        assert!(matches!(
            registry.resolve("Groq: llama3", 0.1),
            Err(CrewError::Credential(_))
        ));
    }

    #[test]
    fn test_rotation_seen_on_next_resolve() {
        let key = Arc::new(parking_lot::Mutex::new(None::<String>));
        let source = Arc::clone(&key);
        let registry = ProviderRegistry::with_defaults(Arc::new(FnConfig(move |name: &str| {
            (name == "ANTHROPIC_API_KEY").then(|| source.lock().clone()).flatten()
        })));

        assert!(registry.resolve("Anthropic: claude", 0.1).is_err());
        *key.lock() = Some("sk-ant-rotated".to_string());
        assert!(registry.resolve("Anthropic: claude", 0.1).is_ok());
    }

    #[test]
    fn test_register_custom_provider() {
        let mut registry = ProviderRegistry::new(Arc::new(MapConfig::new()));
        registry.register(
            "Stub",
            CredentialRequirements::none(),
            Arc::new(|spec: &ProviderSpec, _: Credentials| Ok(Box::new(MockLLM::fixed("OK").with_model(spec.model.as_str())) as Box<dyn BaseLLM>)),
        );
        let llm = registry.resolve("Stub: echo", 0.0).unwrap();
        assert_eq!(llm.model(), "echo");
        assert_eq!(registry.providers(), vec!["Stub"]);
    }
}
