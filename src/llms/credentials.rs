//! Credential and configuration lookup.
//!
//! The registry never reads files or mutates the process environment. It asks
//! an injected [`ConfigSource`] for each key and hands the result to one
//! backend constructor as an explicit [`Credentials`] value.

use std::collections::HashMap;
use std::fmt;

/// Process-wide key-value configuration, injected into the registry.
pub trait ConfigSource: Send + Sync {
    /// Look up a configuration value.
    fn get(&self, key: &str) -> Option<String>;

    /// Look up a value, treating blank strings as absent.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Reads the current process environment on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory configuration map.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl From<HashMap<String, String>> for MapConfig {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Configuration backed by a lookup closure.
pub struct FnConfig<F>(pub F);

impl<F> ConfigSource for FnConfig<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }
}

/// Credentials resolved for a single backend.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// API key, if the provider needs one.
    pub api_key: Option<String>,
    /// Endpoint base URL, if configured.
    pub base_url: Option<String>,
}

impl Credentials {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self { api_key, base_url }
    }

    /// API key or empty string.
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    /// Base URL without trailing slashes, falling back to `default`.
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

// API keys never reach logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Mask an API key for display.
pub fn mask_api_key(key: &str) -> String {
    if key.chars().count() <= 8 {
        return "****".to_string();
    }
    let head: String = key.chars().take(4).collect();
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_config_blank_is_absent() {
        let config = MapConfig::new().with("OPENAI_API_KEY", "   ");
        assert_eq!(config.get("OPENAI_API_KEY").as_deref(), Some("   "));
        assert_eq!(config.get_non_empty("OPENAI_API_KEY"), None);
    }

    #[test]
    fn test_fn_config() {
        let config = FnConfig(|key: &str| (key == "GROQ_API_KEY").then(|| "gsk_test".to_string()));
        assert_eq!(config.get_non_empty("GROQ_API_KEY").as_deref(), Some("gsk_test"));
        assert_eq!(config.get("OTHER"), None);
    }

    #[test]
    fn test_debug_masks_key() {
        let creds = Credentials::new(Some("sk-1234567890abcdef".into()), None);
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("sk-1...cdef"));
        assert!(!rendered.contains("567890"));
    }

    #[test]
    fn test_base_url_or_trims_slash() {
        let creds = Credentials::new(None, Some("http://localhost:1234/v1/".into()));
        assert_eq!(creds.base_url_or("unused"), "http://localhost:1234/v1");
        assert_eq!(
            Credentials::default().base_url_or("https://api.openai.com/v1/"),
            "https://api.openai.com/v1"
        );
    }
}
