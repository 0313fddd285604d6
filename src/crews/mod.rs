//! Crew execution: run state, the two processes, trace and results.

pub mod crew_output;
pub mod definition;
pub mod execution_trace;
pub(crate) mod hierarchical;
pub(crate) mod invocation;
pub(crate) mod sequential;

pub use crew_output::{CrewOutput, FailureKind, RunFailure, RunOutcome};
pub use definition::RunRequest;
pub use execution_trace::{ExecutionTrace, TraceEntry, TraceKind};
