//! Declarative crew definition.
//!
//! A [`RunRequest`] is everything `run` needs besides credentials:
//!
//! ```yaml
//! process: hierarchical
//! manager_role: Manager
//! agents:
//!   - role: Manager
//!     goal: Coordinate the {topic} plan
//!     backstory: Runs the crew.
//!     llm: "OpenAI: gpt-4o"
//!     allow_delegation: true
//!   - role: Writer
//!     goal: Write
//!     backstory: Writes.
//!     llm: "Groq: llama3-70b-8192"
//! tasks:
//!   - name: outline
//!     description: Outline a {topic} plan
//!     expected_output: Bullet points
//! options:
//!   max_rpm: 30
//! inputs:
//!   topic: union
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::agent::utils::AgentConfig;
use crate::crew::CrewOptions;
use crate::process::Process;
use crate::task::TaskConfig;
use crate::utilities::errors::{CrewError, Result};

/// A crew definition plus the inputs of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub agents: Vec<AgentConfig>,
    pub tasks: Vec<TaskConfig>,
    /// Role of the manager. Required by the hierarchical process.
    #[serde(default)]
    pub manager_role: Option<String>,
    #[serde(default)]
    pub process: Process,
    #[serde(default)]
    pub options: CrewOptions,
    /// `{placeholder}` substitutions for agent and task text.
    #[serde(default)]
    pub inputs: HashMap<String, String>,
}

impl RunRequest {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| CrewError::configuration(format!("invalid crew definition: {}", e)))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading crew definition '{}'", path.display()))?;
        Self::from_yaml_str(&yaml)
    }

    /// Add or replace one input.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }
}
