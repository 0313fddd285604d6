//! Short-term memory for a single run.
//!
//! Holds task outputs and delegation exchanges in arrival order. The manager
//! sees a summary of the most recent entries on every dispatch. Nothing
//! outlives the run.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::utilities::string_utils::truncate_chars;

/// Entries shown in a summary by default.
pub const DEFAULT_MAX_ENTRIES: usize = 32;

/// Longest entry text kept in a summary.
pub const MAX_ENTRY_CHARS: usize = 2000;

/// An item stored in short-term memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermMemoryItem {
    pub data: String,
    /// Role of the agent that produced the item.
    pub agent: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ShortTermMemoryItem {
    pub fn new(data: String, agent: Option<String>, metadata: Option<HashMap<String, String>>) -> Self {
        Self {
            data,
            agent,
            metadata: metadata.unwrap_or_default(),
        }
    }
}

/// Append-only run memory.
#[derive(Debug)]
pub struct ShortTermMemory {
    items: RwLock<Vec<ShortTermMemoryItem>>,
    max_entries: usize,
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl ShortTermMemory {
    /// `max_entries` bounds what a summary shows, not what is stored.
    pub fn new(max_entries: usize) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Save a value to short-term memory.
    pub fn save(&self, value: &str, metadata: Option<HashMap<String, String>>, agent_role: Option<&str>) {
        if value.trim().is_empty() {
            return;
        }
        let item = ShortTermMemoryItem::new(
            value.to_string(),
            agent_role.map(str::to_string),
            metadata,
        );
        self.items.write().push(item);
    }

    /// The most recent entries, oldest first, one per line.
    pub fn summary(&self) -> Option<String> {
        let items = self.items.read();
        if items.is_empty() {
            return None;
        }
        let start = items.len().saturating_sub(self.max_entries);
        let lines: Vec<String> = items[start..]
            .iter()
            .map(|item| {
                let data = truncate_chars(item.data.trim(), MAX_ENTRY_CHARS);
                match &item.agent {
                    Some(agent) => format!("- {}: {}", agent, data),
                    None => format!("- {}", data),
                }
            })
            .collect();
        Some(lines.join("\n"))
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_summary() {
        let memory = ShortTermMemory::default();
        memory.save("   ", None, Some("Writer"));
        assert!(memory.is_empty());
        assert_eq!(memory.summary(), None);
    }

    #[test]
    fn test_summary_is_additive_and_ordered() {
        let memory = ShortTermMemory::default();
        memory.save("Ideas listed", None, Some("Researcher"));
        memory.save("Plan drafted", None, None);
        assert_eq!(
            memory.summary().unwrap(),
            "- Researcher: Ideas listed\n- Plan drafted"
        );
    }

    #[test]
    fn test_summary_shows_latest_entries() {
        let memory = ShortTermMemory::new(2);
        for i in 0..5 {
            memory.save(&format!("entry {i}"), None, None);
        }
        assert_eq!(memory.len(), 5);
        assert_eq!(memory.summary().unwrap(), "- entry 3\n- entry 4");
    }
}
