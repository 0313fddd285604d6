//! Delegation tools handed to the manager.
//!
//! `AgentTools` builds the delegate-work and ask-question tools for a set of
//! coworkers, renders them for the manager's prompt and turns the manager's
//! actions back into [`DelegationRequest`]s.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ask_question_tool::AskQuestionTool;
use super::delegate_work_tool::DelegateWorkTool;
use crate::agents::parser::AgentAction;
use crate::utilities::i18n::{fill, I18N};
use crate::utilities::string_utils::sanitize_agent_name;

/// Which tool produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationKind {
    DelegateWork,
    AskQuestion,
}

/// A validated delegation to one coworker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    pub kind: DelegationKind,
    /// Coworker role exactly as declared in the crew.
    pub coworker: String,
    /// The task or question.
    pub request: String,
    pub context: String,
}

/// Delegation and question tools for a set of coworkers.
#[derive(Debug, Clone)]
pub struct AgentTools {
    i18n: I18N,
    delegate: DelegateWorkTool,
    ask: AskQuestionTool,
}

impl AgentTools {
    pub fn new(i18n: &I18N, coworker_roles: Vec<String>) -> Self {
        Self {
            delegate: DelegateWorkTool::new(i18n, coworker_roles.clone()),
            ask: AskQuestionTool::new(i18n, coworker_roles),
            i18n: i18n.clone(),
        }
    }

    /// Tool listing for the manager's prompt.
    pub fn descriptions(&self) -> String {
        [
            (&self.delegate.name, DelegateWorkTool::args_schema(), &self.delegate.description),
            (&self.ask.name, AskQuestionTool::args_schema(), &self.ask.description),
        ]
        .iter()
        .map(|(name, args, description)| {
            format!(
                "Tool Name: {}\nTool Arguments: {}\nTool Description: {}",
                name, args, description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
    }

    /// Comma-separated tool names.
    pub fn tool_names(&self) -> String {
        format!("{}, {}", self.delegate.name, self.ask.name)
    }

    /// Validate one manager action. The error is a note for the manager.
    pub fn prepare(&self, action: &AgentAction) -> Result<DelegationRequest, String> {
        let tool = action.tool.trim().to_lowercase();
        if tool == self.delegate.name.to_lowercase() {
            self.delegate.prepare(&self.i18n, &action.tool_input)
        } else if tool == self.ask.name.to_lowercase() {
            self.ask.prepare(&self.i18n, &action.tool_input)
        } else {
            Err(fill(
                &self.i18n.errors("wrong_tool_name"),
                &[("tool", &action.tool), ("tools", &self.tool_names())],
            ))
        }
    }
}

/// Look up a coworker ignoring case, quotes and extra whitespace.
pub(crate) fn find_coworker(
    i18n: &I18N,
    coworkers: &[String],
    name: &str,
) -> Result<String, String> {
    let wanted = sanitize_agent_name(name);
    coworkers
        .iter()
        .find(|role| sanitize_agent_name(role) == wanted)
        .cloned()
        .ok_or_else(|| {
            let available = coworkers
                .iter()
                .map(|role| format!("- {}", role))
                .collect::<Vec<_>>()
                .join("\n");
            fill(&i18n.errors("unexisting_coworker"), &[("coworkers", &available)])
        })
}

/// Decode a JSON object action input.
pub(crate) fn parse_tool_input<T: DeserializeOwned>(
    i18n: &I18N,
    tool: &str,
    keys: &str,
    tool_input: &str,
) -> Result<T, String> {
    serde_json::from_str(tool_input).map_err(|e| {
        fill(
            &i18n.errors("invalid_action_input"),
            &[("tool", tool), ("keys", keys), ("error", &e.to_string())],
        )
    })
}
