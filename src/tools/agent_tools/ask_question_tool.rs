//! Ask question tool.
//!
//! Lets the manager ask a coworker a question.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::agent_tools::{find_coworker, parse_tool_input, DelegationKind, DelegationRequest};
use crate::utilities::i18n::{fill, I18N};

/// Tool name the manager writes after `Action:`.
pub const ASK_QUESTION_TOOL_NAME: &str = "Ask question to coworker";

/// Arguments of the ask question tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskQuestionToolSchema {
    pub question: String,
    #[serde(default)]
    pub context: String,
    pub coworker: String,
}

/// Tool for asking questions to coworkers.
#[derive(Debug, Clone)]
pub struct AskQuestionTool {
    pub name: String,
    pub description: String,
    coworker_names: Vec<String>,
}

impl AskQuestionTool {
    pub fn new(i18n: &I18N, coworker_names: Vec<String>) -> Self {
        let description = fill(
            &i18n.tools("ask_question"),
            &[("coworkers", &coworker_names.join(", "))],
        );
        Self {
            name: ASK_QUESTION_TOOL_NAME.to_string(),
            description,
            coworker_names,
        }
    }

    /// JSON schema of the tool's arguments.
    pub fn args_schema() -> Value {
        serde_json::json!({
            "question": {"type": "string", "description": "The question to ask"},
            "context": {"type": "string", "description": "The context for the question"},
            "coworker": {"type": "string", "description": "The role/name of the coworker to ask"}
        })
    }

    pub fn prepare(&self, i18n: &I18N, tool_input: &str) -> Result<DelegationRequest, String> {
        let args: AskQuestionToolSchema =
            parse_tool_input(i18n, &self.name, "question, context, coworker", tool_input)?;
        let coworker = find_coworker(i18n, &self.coworker_names, &args.coworker)?;
        Ok(DelegationRequest {
            kind: DelegationKind::AskQuestion,
            coworker,
            request: args.question,
            context: args.context,
        })
    }
}
