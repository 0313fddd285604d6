//! Agents: role-bound actors over a completion backend.

pub mod core;
pub mod utils;

pub use self::core::{Agent, PromptContext};
pub use self::utils::AgentConfig;
