//! Declared agent capabilities.
//!
//! A capability is a named tool an agent may mention in its prompts. The
//! crew never calls it; any tool use happens inside the backend.

use serde::{Deserialize, Serialize};

/// A tool an agent declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// `name: description`, or just the name.
    pub fn describe(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.description)
        }
    }
}

impl From<&str> for Capability {
    fn from(name: &str) -> Self {
        Self::new(name, "")
    }
}
