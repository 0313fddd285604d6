//! Parser for ReAct-style manager replies.
//!
//! A reply either carries one or more `Action:` / `Action Input:` pairs
//! (each one a delegation request) or a `Final Answer:`, never both. Anything
//! after the first `Observation:` line is discarded, since observations are
//! supplied by the crew, never by the model.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The text prefix for a final answer.
pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";

const MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE: &str =
    "I found an Action but couldn't find a valid Action Input right after it.";

const FINAL_ANSWER_AND_PARSABLE_ACTION_ERROR_MESSAGE: &str =
    "I found both a Final Answer and an Action. Either delegate with an Action or give your Final Answer, not both.";

const EMPTY_REPLY_ERROR_MESSAGE: &str = "The reply was empty.";

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t*]*(Action\s*\d*\s*Input\s*\d*|Action\s*\d*|Thought|Final Answer|Observation)[ \t*]*:",
    )
    .expect("valid marker regex")
});

/// A tool call requested by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Reasoning written before the action.
    pub thought: String,
    /// Tool name as written.
    pub tool: String,
    /// Raw tool input, JSON-repaired when possible.
    pub tool_input: String,
}

/// The manager's final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFinish {
    pub thought: String,
    pub output: String,
}

/// A reply that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputParserError {
    pub error: String,
}

impl OutputParserError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl fmt::Display for OutputParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputParserError: {}", self.error)
    }
}

impl std::error::Error for OutputParserError {}

/// Result of parsing a manager reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// One or more delegation requests, in the order written.
    Actions(Vec<AgentAction>),
    /// The manager is done.
    Finish(AgentFinish),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Action,
    ActionInput,
    Thought,
    FinalAnswer,
    Observation,
}

impl Marker {
    fn classify(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label.starts_with("final") {
            Self::FinalAnswer
        } else if label.starts_with("thought") {
            Self::Thought
        } else if label.starts_with("observation") {
            Self::Observation
        } else if label.contains("input") {
            Self::ActionInput
        } else {
            Self::Action
        }
    }
}

/// Parse a manager reply.
///
/// A reply with neither an action nor a final answer is taken as a direct
/// final answer.
pub fn parse(text: &str) -> Result<ParseResult, OutputParserError> {
    if text.trim().is_empty() {
        return Err(OutputParserError::new(EMPTY_REPLY_ERROR_MESSAGE));
    }

    let mut segments: Vec<(Marker, &str)> = Vec::new();
    let markers: Vec<_> = MARKER.captures_iter(text).collect();
    let preamble_end = markers
        .first()
        .and_then(|c| c.get(0))
        .map_or(text.len(), |m| m.start());
    let preamble = text[..preamble_end].trim();

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let marker = Marker::classify(label.as_str());
        if marker == Marker::Observation {
            break;
        }
        if marker == Marker::FinalAnswer {
            segments.push((marker, &text[whole.end()..]));
            break;
        }
        let end = markers
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map_or(text.len(), |m| m.start());
        segments.push((marker, &text[whole.end()..end]));
    }

    let mut thought = preamble.to_string();
    let mut actions: Vec<AgentAction> = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for (marker, body) in segments {
        let body = body.trim();
        match marker {
            Marker::Thought => thought = body.replace("```", "").trim().to_string(),
            Marker::Action => {
                if pending.is_some() {
                    return Err(OutputParserError::new(
                        MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE,
                    ));
                }
                pending = Some((thought.clone(), clean_action(body)));
            }
            Marker::ActionInput => {
                let Some((thought, tool)) = pending.take() else {
                    return Err(OutputParserError::new(
                        "I found an Action Input without an Action before it.",
                    ));
                };
                let tool_input = clean_trailing_backticks(body);
                actions.push(AgentAction {
                    thought,
                    tool,
                    tool_input: safe_repair_json(tool_input.trim_matches('"')),
                });
            }
            Marker::FinalAnswer => {
                if !actions.is_empty() || pending.is_some() {
                    return Err(OutputParserError::new(
                        FINAL_ANSWER_AND_PARSABLE_ACTION_ERROR_MESSAGE,
                    ));
                }
                return Ok(ParseResult::Finish(AgentFinish {
                    thought,
                    output: clean_trailing_backticks(body),
                }));
            }
            Marker::Observation => break,
        }
    }

    if pending.is_some() {
        return Err(OutputParserError::new(
            MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE,
        ));
    }
    if !actions.is_empty() {
        return Ok(ParseResult::Actions(actions));
    }

    Ok(ParseResult::Finish(AgentFinish {
        thought: String::new(),
        output: text.trim().to_string(),
    }))
}

fn clean_action(text: &str) -> String {
    text.trim().trim_matches('*').trim().to_string()
}

/// Drop an unmatched trailing set of triple backticks.
fn clean_trailing_backticks(text: &str) -> String {
    let text = text.trim();
    if text.ends_with("```") && text.matches("```").count() % 2 != 0 {
        return text[..text.len() - 3].trim_end().to_string();
    }
    text.to_string()
}

/// Replace triple quotes when that yields valid JSON; arrays are left alone.
fn safe_repair_json(tool_input: &str) -> String {
    if tool_input.starts_with('[') && tool_input.ends_with(']') {
        return tool_input.to_string();
    }
    let cleaned = tool_input.replace("\"\"\"", "\"");
    if serde_json::from_str::<Value>(&cleaned).is_ok() {
        return cleaned;
    }
    tool_input.to_string()
}
