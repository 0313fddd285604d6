//! Crew output and run outcome.
//!
//! A run ends either with a [`CrewOutput`] or with a classified
//! [`RunFailure`]; [`RunOutcome`] carries one of the two to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::execution_trace::ExecutionTrace;
use crate::tasks::task_output::TaskOutput;
use crate::types::usage_metrics::UsageMetrics;
use crate::utilities::errors::CrewError;

/// The result of a crew run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Raw output of the last synchronous task that finished.
    pub raw: String,
    /// Output of each task in declared order.
    pub tasks_output: Vec<TaskOutput>,
    /// Everything the agents did, in order.
    pub trace: ExecutionTrace,
    pub token_usage: UsageMetrics,
}

impl CrewOutput {
    pub fn new(
        raw: String,
        tasks_output: Vec<TaskOutput>,
        trace: ExecutionTrace,
        token_usage: UsageMetrics,
    ) -> Self {
        Self {
            raw,
            tasks_output,
            trace,
            token_usage,
        }
    }

    pub fn final_output(&self) -> &str {
        &self.raw
    }

    /// Output of the task with this name.
    pub fn task(&self, name: &str) -> Option<&TaskOutput> {
        self.tasks_output
            .iter()
            .find(|t| t.name.as_deref() == Some(name))
    }
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Classification of a run-fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Credential,
    Cancelled,
    /// No synchronous task finished.
    NoOutput,
    /// Anything not classified otherwise.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration error",
            Self::Credential => "credential error",
            Self::Cancelled => "cancelled",
            Self::NoOutput => "no output",
            Self::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// A run that did not produce a result.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RunFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Source chain of the underlying error, outermost first.
    pub causes: Vec<String>,
    /// Work recorded before the failure, when the run got that far.
    pub trace: Option<ExecutionTrace>,
    /// Task outputs recorded before the failure.
    #[serde(default)]
    pub tasks_output: Vec<TaskOutput>,
}

impl RunFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            causes: Vec::new(),
            trace: None,
            tasks_output: Vec::new(),
        }
    }

    /// Classify `err`, keeping its source chain.
    pub fn from_error(err: &CrewError) -> Self {
        let kind = match err {
            CrewError::Configuration(_) => FailureKind::Configuration,
            CrewError::Credential(_) => FailureKind::Credential,
            CrewError::Cancelled => FailureKind::Cancelled,
            CrewError::DelegationDepthExceeded(_) | CrewError::Backend(_) | CrewError::Other(_) => {
                FailureKind::Internal
            }
        };
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            causes,
            ..Self::new(kind, err.to_string())
        }
    }

    pub fn with_trace(mut self, trace: ExecutionTrace, tasks_output: Vec<TaskOutput>) -> Self {
        self.trace = Some(trace);
        self.tasks_output = tasks_output;
        self
    }
}

/// What the run boundary hands back: a result or a classified failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(CrewOutput),
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn output(&self) -> Option<&CrewOutput> {
        match self {
            Self::Completed(output) => Some(output),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<CrewOutput, RunFailure> {
        self.into()
    }
}

impl From<Result<CrewOutput, RunFailure>> for RunOutcome {
    fn from(result: Result<CrewOutput, RunFailure>) -> Self {
        match result {
            Ok(output) => Self::Completed(output),
            Err(failure) => Self::Failed(failure),
        }
    }
}

impl From<RunOutcome> for Result<CrewOutput, RunFailure> {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed(output) => Ok(output),
            RunOutcome::Failed(failure) => Err(failure),
        }
    }
}
