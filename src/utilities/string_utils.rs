//! String utility functions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").expect("valid placeholder regex"));

/// Interpolate `{key}` placeholders in a string while leaving JSON untouched.
///
/// Only placeholders of the form `{variable_name}` are considered, where the
/// name starts with a letter or underscore and contains only alphanumerics,
/// underscores and hyphens. Placeholders without a matching input are left
/// as they are.
pub fn interpolate_only(input: &str, inputs: &HashMap<String, String>) -> String {
    if inputs.is_empty() || !input.contains('{') {
        return input.to_string();
    }

    VARIABLE_PATTERN
        .replace_all(input, |caps: &regex::Captures<'_>| match inputs.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Normalize an agent role for loose matching: collapse whitespace, strip
/// quotes, lowercase.
pub fn sanitize_agent_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('"', "")
        .to_lowercase()
}

/// Truncate to at most `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
