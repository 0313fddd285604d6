//! Agent capabilities and the manager's delegation tools.

pub mod agent_tools;
pub mod capability;

pub use agent_tools::{AgentTools, DelegationKind, DelegationRequest};
pub use capability::Capability;
