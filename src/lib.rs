//! # crew-planner
//!
//! Hierarchical multi-agent crew orchestration over pluggable completion
//! backends.
//!
//! A crew is a set of role-bound agents and an ordered list of tasks. Under
//! the hierarchical process a manager agent delegates each task to its
//! coworkers through the ReAct-style delegation tools and synthesizes their
//! answers; under the sequential process every task runs on its assigned
//! agent. Every backend call goes through a shared rate limiter, an optional
//! run-scoped cache and a bounded retry policy, and every contribution is
//! recorded in an append-only execution trace.
//!
//! ```no_run
//! use std::sync::Arc;
//! use crew_planner::crews::RunRequest;
//! use crew_planner::llms::{EnvConfig, ProviderRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> crew_planner::utilities::errors::Result<()> {
//! let request = RunRequest::from_yaml_file("crew.yaml")?;
//! let registry = ProviderRegistry::with_defaults(Arc::new(EnvConfig));
//! let outcome = crew_planner::run(request, &registry, CancellationToken::new()).await;
//! println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agents;
pub mod crew;
pub mod crews;
pub mod llms;
pub mod memory;
pub mod process;
pub mod task;
pub mod tasks;
pub mod tools;
pub mod types;
pub mod utilities;

pub use agent::{Agent, AgentConfig};
pub use crew::{run, Crew, CrewOptions};
pub use crews::{CrewOutput, ExecutionTrace, RunFailure, RunOutcome, RunRequest};
pub use llms::base_llm::BaseLLM;
pub use llms::registry::ProviderRegistry;
pub use process::Process;
pub use task::{Task, TaskConfig};
pub use tasks::task_output::TaskOutput;
pub use utilities::errors::{BackendError, CredentialError, CrewError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
