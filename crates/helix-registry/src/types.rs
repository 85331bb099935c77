//! Shared types for the registry crate.

use helix_core::RuntimeBackend;
use serde::{Deserialize, Serialize};

/// Labels every packaged agent carries, regardless of backend. Grounded
/// on spec.md §6 "Image labels".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentLabels {
    #[serde(rename = "helix.task", default)]
    pub task: String,
    #[serde(rename = "helix.capabilities", default)]
    pub capabilities: String,
    #[serde(rename = "helix.type", default)]
    pub agent_type: String,
    #[serde(rename = "helix.created", default)]
    pub created: String,
    #[serde(rename = "helix.author", default)]
    pub author: String,
}

impl AgentLabels {
    pub fn capabilities_list(&self) -> Vec<String> {
        self.capabilities
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Result of a unified registry search: which backend matched, with what
/// confidence, and how to reach it. Grounded on
/// `original_source/builder/unified_registry.py::AgentMatch`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentMatch {
    pub name: String,
    pub runtime: RuntimeBackend,
    pub reference: String,
    pub score: f32,
    pub task: String,
    pub capabilities: Vec<String>,
}
