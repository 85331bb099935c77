//! Core domain types shared by every helix crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies a single task handled by the orchestrator, end to end.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TaskId {
    fn from(u: Uuid) -> Self {
        Self(u)
    }
}

/// Coarse agent category used to shape generation prompts and classify
/// incoming tasks before a build is attempted.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentClass {
    Research,
    Compute,
    Data,
    Code,
    Synthesis,
}

impl AgentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentClass::Research => "research",
            AgentClass::Compute => "compute",
            AgentClass::Data => "data",
            AgentClass::Code => "code",
            AgentClass::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for AgentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The recorded outcome of a single task execution.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Partial,
    Pending,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Which tier of the memory store an entry currently lives in.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    Working,
    Episodic,
    Semantic,
    Archive,
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryTier::Working => "working",
            MemoryTier::Episodic => "episodic",
            MemoryTier::Semantic => "semantic",
            MemoryTier::Archive => "archive",
        };
        write!(f, "{}", s)
    }
}

/// Which backend produced an executable agent: a long-lived container
/// image or a WASM module.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeBackend {
    Container,
    Wasm,
}

impl fmt::Display for RuntimeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeBackend::Container => "container",
            RuntimeBackend::Wasm => "wasm",
        };
        write!(f, "{}", s)
    }
}

/// The result of running an agent to completion, regardless of backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub reference: String,
    pub backend: RuntimeBackend,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn outcome(&self) -> Outcome {
        if self.exit_code == 0 {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

/// Environment variable names used to pass credentials into generated
/// agents and outbound LLM/search calls. Kept as named constants so every
/// crate that needs one spells it the same way.
pub mod env_keys {
    pub const LLM_API_KEY: &str = "LLM_API_KEY";
    pub const WEB_SEARCH_KEY: &str = "WEB_SEARCH_KEY";
    pub const WEB_SEARCH_CX: &str = "WEB_SEARCH_CX";
    pub const MEMORY_KEY: &str = "HELIX_MEMORY_KEY";
}
