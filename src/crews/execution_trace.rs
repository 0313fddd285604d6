//! Execution trace of a run.
//!
//! Every agent invocation that contributes to a task result appends one
//! [`TraceEntry`]. During the run entries go through a shared
//! [`TraceRecorder`]; at the end the recorder is frozen into an
//! [`ExecutionTrace`], which has no mutating API.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// An agent answered a task without delegating.
    Direct,
    /// A coworker answered a delegated request.
    Delegation,
    /// A delegated request failed after retries.
    DelegationFailed,
    /// The manager merged delegated results into the task output.
    Synthesis,
    /// The task failed; the entry carries the reason and partial results.
    TaskFailed,
}

/// One step of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub task_id: Uuid,
    pub acting_agent_role: String,
    /// Roles a delegation was sent to. Set only on delegation entries.
    pub delegated_to: Option<Vec<String>>,
    /// Coworkers whose results a synthesis merged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<String>,
    pub raw_output: String,
    pub timestamp: DateTime<Utc>,
    pub kind: TraceKind,
}

impl TraceEntry {
    fn new(
        task_id: Uuid,
        acting_agent_role: &str,
        delegated_to: Option<Vec<String>>,
        raw_output: String,
        kind: TraceKind,
    ) -> Self {
        Self {
            task_id,
            acting_agent_role: acting_agent_role.to_string(),
            delegated_to,
            contributors: Vec::new(),
            raw_output,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn direct(task_id: Uuid, agent: &str, raw_output: String) -> Self {
        Self::new(task_id, agent, None, raw_output, TraceKind::Direct)
    }

    pub fn delegation(task_id: Uuid, manager: &str, coworker: &str, raw_output: String) -> Self {
        Self::new(
            task_id,
            manager,
            Some(vec![coworker.to_string()]),
            raw_output,
            TraceKind::Delegation,
        )
    }

    pub fn delegation_failed(task_id: Uuid, manager: &str, coworker: &str, error: String) -> Self {
        Self::new(
            task_id,
            manager,
            Some(vec![coworker.to_string()]),
            error,
            TraceKind::DelegationFailed,
        )
    }

    pub fn synthesis(task_id: Uuid, manager: &str, coworkers: Vec<String>, raw_output: String) -> Self {
        Self {
            contributors: coworkers,
            ..Self::new(task_id, manager, None, raw_output, TraceKind::Synthesis)
        }
    }

    pub fn task_failed(task_id: Uuid, agent: &str, reason: String) -> Self {
        Self::new(task_id, agent, None, reason, TraceKind::TaskFailed)
    }
}

/// Append-only, ordered log of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Entries for one task, in order.
    pub fn for_task(&self, task_id: Uuid) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter().filter(move |e| e.task_id == task_id)
    }

    /// Successful delegations sent to `role`.
    pub fn delegations_to<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a TraceEntry> {
        self.entries.iter().filter(move |e| {
            e.kind == TraceKind::Delegation
                && e.delegated_to
                    .as_ref()
                    .is_some_and(|roles| roles.iter().any(|r| r == role))
        })
    }

    pub fn count(&self, kind: TraceKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

/// Shared writer used while a run is in progress.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    entries: Arc<Mutex<Vec<TraceEntry>>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: TraceEntry) {
        self.entries.lock().push(entry);
    }

    /// Append several entries without interleaving.
    pub fn record_all(&self, entries: impl IntoIterator<Item = TraceEntry>) {
        self.entries.lock().extend(entries);
    }

    /// Copy of the entries recorded so far.
    pub fn snapshot(&self) -> ExecutionTrace {
        ExecutionTrace {
            entries: self.entries.lock().clone(),
        }
    }
}
