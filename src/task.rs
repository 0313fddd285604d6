//! Task definition and lifecycle.
//!
//! A [`Task`] is an immutable unit of work. Its progress through a run is
//! tracked separately by a [`TaskLifecycle`], which only allows the
//! transitions of [`TaskState`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utilities::errors::{CrewError, Result};
use crate::utilities::string_utils::interpolate_only;

/// Whether the ordered sequence waits for a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Later tasks wait for this one and may depend on its output.
    #[default]
    Synchronous,
    /// Runs alongside later tasks; its output is never a dependency.
    FireAndForget,
}

/// Progress of one task within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Dispatched,
    Delegated,
    Collected,
    Synthesized,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Pending, Dispatched)
                | (Dispatched, Delegated)
                | (Dispatched, Synthesized)
                | (Delegated, Collected)
                | (Collected, Delegated)
                | (Collected, Synthesized)
                | (Synthesized, Done)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Delegated => "delegated",
            Self::Collected => "collected",
            Self::Synthesized => "synthesized",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State tracker for one task in one run.
#[derive(Debug, Clone)]
pub struct TaskLifecycle {
    task: String,
    state: TaskState,
}

impl TaskLifecycle {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `next`, rejecting transitions the state machine forbids.
    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(CrewError::Other(anyhow::anyhow!(
                "task '{}' cannot move from {} to {}",
                self.task,
                self.state,
                next
            )));
        }
        log::debug!("Task '{}': {} -> {}", self.task, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Mark the task failed unless it already finished.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            log::debug!("Task '{}': {} -> failed", self.task, self.state);
            self.state = TaskState::Failed;
        }
    }
}

/// Declarative task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Name other tasks use in `depends_on`.
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    pub expected_output: String,
    /// Role of the assigned agent. Optional under the hierarchical process.
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Name of an earlier synchronous task whose output is this task's context.
    #[serde(default)]
    pub depends_on: Option<String>,
}

impl TaskConfig {
    pub fn into_task(self) -> Task {
        Task {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            expected_output: self.expected_output,
            agent: self.agent,
            execution_mode: self.execution_mode,
            depends_on: self.depends_on,
        }
    }
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: Uuid,
    name: Option<String>,
    description: String,
    expected_output: String,
    agent: Option<String>,
    execution_mode: ExecutionMode,
    depends_on: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            description: description.into(),
            expected_output: expected_output.into(),
            agent: None,
            execution_mode: ExecutionMode::Synchronous,
            depends_on: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_agent(mut self, role: impl Into<String>) -> Self {
        self.agent = Some(role.into());
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_depends_on(mut self, task: impl Into<String>) -> Self {
        self.depends_on = Some(task.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if set, otherwise the id.
    pub fn key(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    pub fn is_fire_and_forget(&self) -> bool {
        self.execution_mode == ExecutionMode::FireAndForget
    }

    pub fn depends_on(&self) -> Option<&str> {
        self.depends_on.as_deref()
    }

    /// Fill `{placeholders}` in description and expected output.
    pub fn interpolate_inputs(self, inputs: &HashMap<String, String>) -> Self {
        if inputs.is_empty() {
            return self;
        }
        Self {
            description: interpolate_only(&self.description, inputs),
            expected_output: interpolate_only(&self.expected_output, inputs),
            ..self
        }
    }
}
