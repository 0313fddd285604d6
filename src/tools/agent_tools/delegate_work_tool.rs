//! Delegate work tool.
//!
//! Lets the manager hand a specific task to a coworker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::agent_tools::{find_coworker, parse_tool_input, DelegationKind, DelegationRequest};
use crate::utilities::i18n::{fill, I18N};

/// Tool name the manager writes after `Action:`.
pub const DELEGATE_WORK_TOOL_NAME: &str = "Delegate work to coworker";

/// Arguments of the delegate work tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateWorkToolSchema {
    /// The task to delegate.
    pub task: String,
    /// Everything the coworker needs to know.
    #[serde(default)]
    pub context: String,
    /// Role of the coworker.
    pub coworker: String,
}

/// Tool for delegating work to coworkers.
#[derive(Debug, Clone)]
pub struct DelegateWorkTool {
    pub name: String,
    /// Description listing the available coworkers.
    pub description: String,
    coworker_names: Vec<String>,
}

impl DelegateWorkTool {
    pub fn new(i18n: &I18N, coworker_names: Vec<String>) -> Self {
        let description = fill(
            &i18n.tools("delegate_work"),
            &[("coworkers", &coworker_names.join(", "))],
        );
        Self {
            name: DELEGATE_WORK_TOOL_NAME.to_string(),
            description,
            coworker_names,
        }
    }

    /// JSON schema of the tool's arguments.
    pub fn args_schema() -> Value {
        serde_json::json!({
            "task": {"type": "string", "description": "The task to delegate"},
            "context": {"type": "string", "description": "The context for the task"},
            "coworker": {"type": "string", "description": "The role/name of the coworker to delegate to"}
        })
    }

    /// Turn the manager's action input into a delegation request. The error
    /// is a note for the manager.
    pub fn prepare(&self, i18n: &I18N, tool_input: &str) -> Result<DelegationRequest, String> {
        let args: DelegateWorkToolSchema =
            parse_tool_input(i18n, &self.name, "task, context, coworker", tool_input)?;
        let coworker = find_coworker(i18n, &self.coworker_names, &args.coworker)?;
        Ok(DelegationRequest {
            kind: DelegationKind::DelegateWork,
            coworker,
            request: args.task,
            context: args.context,
        })
    }
}
