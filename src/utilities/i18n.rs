//! Prompt text lookup.
//!
//! Prompt fragments live in `translations/en.json` and are embedded at
//! compile time. A custom JSON file with the same layout can replace them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Embedded English prompts.
const EMBEDDED_EN_JSON: &str = include_str!("../translations/en.json");

/// Prompts stored as `kind -> key -> text`.
#[derive(Debug, Clone, Default)]
pub struct I18N {
    prompts: HashMap<String, HashMap<String, String>>,
}

impl I18N {
    /// Load the embedded English prompts.
    pub fn embedded() -> Self {
        match serde_json::from_str(EMBEDDED_EN_JSON) {
            Ok(prompts) => Self { prompts },
            Err(e) => {
                log::error!("Embedded en.json could not be decoded: {}", e);
                Self::default()
            }
        }
    }

    /// Load prompts from a custom JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("prompt file '{}' not found", path.display()))?;
        let prompts = serde_json::from_str(&content)
            .with_context(|| format!("error decoding prompt file '{}'", path.display()))?;
        Ok(Self { prompts })
    }

    /// Retrieve a prompt slice by key.
    pub fn slice(&self, slice: &str) -> String {
        self.retrieve("slices", slice)
    }

    /// Retrieve an error message by key.
    pub fn errors(&self, error: &str) -> String {
        self.retrieve("errors", error)
    }

    /// Retrieve a tool description by key.
    pub fn tools(&self, tool: &str) -> String {
        self.retrieve("tools", tool)
    }

    /// Retrieve a prompt by `kind` and `key`; unknown entries render empty.
    pub fn retrieve(&self, kind: &str, key: &str) -> String {
        match self.prompts.get(kind).and_then(|section| section.get(key)) {
            Some(text) => text.clone(),
            None => {
                log::warn!("Prompt for '{}':'{}' not found", kind, key);
                String::new()
            }
        }
    }
}

static DEFAULT_I18N: OnceLock<I18N> = OnceLock::new();

/// Shared instance over the embedded prompts.
pub fn get_i18n() -> &'static I18N {
    DEFAULT_I18N.get_or_init(I18N::embedded)
}

static SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("valid slot regex"));

/// Fill `{name}` slots in a prompt fragment in one pass. Slots without a
/// value, and braces inside the filled values, are left as written.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    SLOT.replace_all(template, |caps: &Captures<'_>| {
        values
            .iter()
            .find(|(key, _)| *key == &caps[1])
            .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_prompts_present() {
        let i18n = get_i18n();
        for key in ["role_playing", "task", "context", "memory", "tools", "manager_request"] {
            assert!(!i18n.slice(key).is_empty(), "missing slice {key}");
        }
        assert!(i18n.tools("delegate_work").contains("{coworkers}"));
        assert!(i18n.errors("unexisting_coworker").contains("{coworkers}"));
    }

    #[test]
    fn test_missing_key_is_empty() {
        assert_eq!(get_i18n().slice("does_not_exist"), "");
    }

    #[test]
    fn test_fill() {
        let text = fill("You are {role}. {backstory}", &[("role", "Planner"), ("backstory", "Calm.")]);
        assert_eq!(text, "You are Planner. Calm.");
    }

    #[test]
    fn test_fill_leaves_braces_in_values() {
        let text = fill(
            "You are {role}. {backstory}\nYour personal goal is: {goal}",
            &[("role", "Planner"), ("backstory", "Quotes {goal} and {expected_output}."), ("goal", "Plan")],
        );
        assert_eq!(
            text,
            "You are Planner. Quotes {goal} and {expected_output}.\nYour personal goal is: Plan"
        );
        assert_eq!(fill("{unknown} {role}", &[("role", "R")]), "{unknown} R");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{"slices": {"task": "Do: {input}"}}"#).unwrap();
        let i18n = I18N::from_file(&path).unwrap();
        assert_eq!(i18n.slice("task"), "Do: {input}");
        assert!(I18N::from_file(dir.path().join("missing.json")).is_err());
    }
}
