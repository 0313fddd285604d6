//! Process types for crew execution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a crew works through its tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// Each task runs on its assigned agent, in order.
    Sequential,
    /// A manager agent delegates every task and synthesizes the result.
    #[default]
    Hierarchical,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
            Process::Hierarchical => write!(f, "hierarchical"),
        }
    }
}
