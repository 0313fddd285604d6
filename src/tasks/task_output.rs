//! Task output representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::task::{Task, TaskState};

/// Result of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: Uuid,
    pub name: Option<String>,
    pub description: String,
    pub expected_output: String,
    /// First words of the description.
    pub summary: String,
    /// Raw output; empty when the task failed.
    pub raw: String,
    /// Role that produced the output (the manager under the hierarchical process).
    pub agent: String,
    /// `Done` or `Failed`.
    pub state: TaskState,
    /// Delegated sub-invocations made for this task.
    pub delegations: usize,
    /// Why the task failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutput {
    /// Output of a finished task.
    pub fn completed(task: &Task, agent: &str, raw: String, delegations: usize) -> Self {
        Self::build(task, agent, raw, TaskState::Done, delegations, None)
    }

    /// Output of a failed task.
    pub fn failed(task: &Task, agent: &str, error: String, delegations: usize) -> Self {
        Self::build(task, agent, String::new(), TaskState::Failed, delegations, Some(error))
    }

    fn build(
        task: &Task,
        agent: &str,
        raw: String,
        state: TaskState,
        delegations: usize,
        error: Option<String>,
    ) -> Self {
        Self {
            task_id: task.id(),
            name: task.name().map(str::to_string),
            description: task.description().to_string(),
            expected_output: task.expected_output().to_string(),
            summary: Self::generate_summary(task.description()),
            raw,
            agent: agent.to_string(),
            state,
            delegations,
            error,
        }
    }

    /// First 10 words of the description followed by "...".
    fn generate_summary(description: &str) -> String {
        let excerpt: String = description
            .split_whitespace()
            .take(10)
            .collect::<Vec<&str>>()
            .join(" ");
        format!("{}...", excerpt)
    }

    pub fn is_done(&self) -> bool {
        self.state == TaskState::Done
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) if !self.is_done() => write!(f, "[failed] {}", error),
            _ => write!(f, "{}", self.raw),
        }
    }
}
