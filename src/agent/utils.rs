//! Agent configuration and construction.

use serde::{Deserialize, Serialize};

use super::core::Agent;
use crate::llms::registry::ProviderRegistry;
use crate::tools::capability::Capability;
use crate::utilities::errors::Result;

/// Default sampling temperature for agents.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

/// Declarative agent definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique role; tasks and the manager address the agent by it.
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Provider selector, `"<Provider>: <model>"`.
    pub llm: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub tools: Vec<Capability>,
    #[serde(default)]
    pub allow_delegation: bool,
}

impl AgentConfig {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            llm: llm.into(),
            temperature: DEFAULT_TEMPERATURE,
            tools: Vec::new(),
            allow_delegation: false,
        }
    }

    /// Resolve the backend and build the agent. Credential problems surface
    /// here, before any agent work starts.
    pub fn build(&self, registry: &ProviderRegistry) -> Result<Agent> {
        let llm = registry.resolve(&self.llm, self.temperature)?;
        Ok(Agent::new(
            self.role.clone(),
            self.goal.clone(),
            self.backstory.clone(),
            llm,
        )
        .with_tools(self.tools.clone())
        .with_delegation(self.allow_delegation))
    }
}
