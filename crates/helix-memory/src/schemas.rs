//! Entry types stored in the episodic and semantic tiers, and the
//! in-process working context. Grounded on `original_source/memory/schemas.py`.

use chrono::{DateTime, Utc};
use helix_core::{AgentClass, MemoryTier, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Fields common to every stored memory entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryMeta {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    pub current_tier: MemoryTier,
    pub embedding: Option<Vec<f32>>,
}

impl EntryMeta {
    pub fn new(tier: MemoryTier) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_accessed: now,
            access_count: 0,
            current_tier: tier,
            embedding: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
        self.access_count += 1;
    }
}

/// A single recorded task execution (episodic tier entry).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskMemory {
    #[serde(flatten)]
    pub meta: EntryMeta,

    pub raw_task: String,
    pub refined_task: String,
    pub task_type: Option<String>,
    pub agent_type: Option<AgentClass>,
    pub agent_image: Option<String>,
    pub tools_used: Vec<String>,
    pub outcome: Outcome,
    pub execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub result_summary: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub user_feedback: Option<String>,
    pub user_rating: Option<u8>,
}

impl TaskMemory {
    pub fn new(raw_task: impl Into<String>, refined_task: impl Into<String>) -> Self {
        Self {
            meta: EntryMeta::new(MemoryTier::Episodic),
            raw_task: raw_task.into(),
            refined_task: refined_task.into(),
            task_type: None,
            agent_type: None,
            agent_image: None,
            tools_used: Vec::new(),
            outcome: Outcome::Pending,
            execution_time_ms: None,
            error_message: None,
            result_summary: None,
            result_data: None,
            user_feedback: None,
            user_rating: None,
        }
    }

    /// 1.0 for success, 0.5 for partial, 0.0 otherwise.
    pub fn success_rate(&self) -> f64 {
        match self.outcome {
            Outcome::Success => 1.0,
            Outcome::Partial => 0.5,
            Outcome::Failure | Outcome::Pending => 0.0,
        }
    }
}

/// Aggregate statistics about an agent class, built up across many task
/// executions (semantic tier entry).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentCapability {
    #[serde(flatten)]
    pub meta: EntryMeta,

    pub agent_type: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub total_executions: u32,
    pub successful_executions: u32,
    pub avg_execution_time_ms: f64,
    pub common_tools: Vec<String>,
    pub task_patterns: Vec<String>,
}

impl AgentCapability {
    pub fn new(agent_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: EntryMeta::new(MemoryTier::Semantic),
            agent_type: agent_type.into(),
            description: description.into(),
            keywords: Vec::new(),
            total_executions: 0,
            successful_executions: 0,
            avg_execution_time_ms: 0.0,
            common_tools: Vec::new(),
            task_patterns: Vec::new(),
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_executions == 0 {
            0.0
        } else {
            self.successful_executions as f64 / self.total_executions as f64
        }
    }
}

/// The session-scoped, in-memory working tier. Never persisted directly;
/// it feeds the episodic tier via `complete_task`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkingContext {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub current_task: Option<String>,
    pub conversation_history: Vec<(String, String)>,
    pub passive_buffer: Vec<(DateTime<Utc>, String)>,
    pub passive_buffer_max_minutes: i64,
    pub context_variables: HashMap<String, serde_json::Value>,
}

/// Default passive-buffer window in minutes, matching
/// `original_source/memory/working.py`'s `buffer_minutes: int = 5`.
pub const DEFAULT_PASSIVE_BUFFER_MINUTES: i64 = 5;

impl WorkingContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_buffer_minutes(session_id, DEFAULT_PASSIVE_BUFFER_MINUTES)
    }

    pub fn with_buffer_minutes(session_id: impl Into<String>, passive_buffer_max_minutes: i64) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Utc::now(),
            current_task: None,
            conversation_history: Vec::new(),
            passive_buffer: Vec::new(),
            passive_buffer_max_minutes,
            context_variables: HashMap::new(),
        }
    }
}
