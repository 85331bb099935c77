//! Public facade over the four memory tiers. Grounded on
//! `original_source/memory/manager.py`, which is the only entry point the
//! rest of the original system used to touch memory.

use crate::cleanup::{Cleanup, CleanupStats};
use crate::context_slicer::{self, ContextSlice};
use crate::db::Database;
use crate::embeddings::{Embedder, FallbackEmbedder};
use crate::episodic::EpisodicMemory;
use crate::error::MemoryResult;
use crate::lifecycle::{LifecycleController, LifecycleStats};
use crate::schemas::{AgentCapability, TaskMemory};
use crate::semantic::SemanticMemory;
use crate::working::WorkingMemory;
use chrono::{DateTime, Utc};
use helix_core::Outcome;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct MemoryStats {
    pub episodic_count: usize,
    pub semantic_count: usize,
    pub encrypted: bool,
}

/// Ties the working, episodic, semantic, and archive tiers together behind
/// a single API, matching the shape callers used against the original
/// `MemoryManager`.
pub struct MemoryManager {
    db: Arc<Database>,
    working: Mutex<WorkingMemory>,
    episodic: EpisodicMemory,
    semantic: SemanticMemory,
    lifecycle: LifecycleController,
    embedder: Box<dyn Embedder>,
    last_lifecycle_run: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryManager {
    pub fn open(db_path: Option<PathBuf>, session_id: impl Into<String>) -> MemoryResult<Self> {
        let db = Arc::new(Database::open(db_path)?);
        Ok(Self::with_database(db, session_id))
    }

    /// Same as `open`, but with an explicit passive-buffer window (the
    /// `HELIX_MEMORY_BUFFER_MINUTES` knob) instead of the default 5 minutes.
    pub fn open_with_buffer_minutes(db_path: Option<PathBuf>, session_id: impl Into<String>, buffer_minutes: i64) -> MemoryResult<Self> {
        let db = Arc::new(Database::open(db_path)?);
        Ok(Self::with_database_and_buffer_minutes(db, session_id, buffer_minutes))
    }

    pub fn with_database(db: Arc<Database>, session_id: impl Into<String>) -> Self {
        Self::with_database_and_buffer_minutes(db, session_id, crate::schemas::DEFAULT_PASSIVE_BUFFER_MINUTES)
    }

    pub fn with_database_and_buffer_minutes(db: Arc<Database>, session_id: impl Into<String>, buffer_minutes: i64) -> Self {
        Self {
            episodic: EpisodicMemory::new(db.clone()),
            semantic: SemanticMemory::new(db.clone()),
            lifecycle: LifecycleController::new(db.clone()),
            working: Mutex::new(WorkingMemory::with_buffer_minutes(session_id, buffer_minutes)),
            db,
            embedder: Box::new(FallbackEmbedder),
            last_lifecycle_run: Mutex::new(None),
        }
    }

    /// Begins tracking a new task in the working tier. A non-empty prior
    /// task in the slot is forcibly recorded as a partial completion
    /// first, so starting a new task never silently discards the one
    /// before it.
    pub fn start_task(&self, task: impl Into<String>) {
        let task = task.into();
        let prior = {
            let mut working = self.working.lock().expect("working memory mutex poisoned");
            let prior = working.get_current_task().map(|t| t.to_string());
            working.set_current_task(task);
            prior
        };

        if let Some(prior_task) = prior.filter(|t| !t.is_empty()) {
            let mut memory = TaskMemory::new(prior_task.clone(), prior_task);
            memory.outcome = Outcome::Partial;
            let _ = self.episodic.store(memory, self.embedder.as_ref());
        }
    }

    /// Records the outcome of the current working-memory task into the
    /// episodic tier and folds it into the agent's semantic aggregate.
    /// `summary` is the trimmed stdout (spec.md §4.1 step 6, ≤500 chars,
    /// truncation is the caller's responsibility) and `error` is the
    /// failure text, if any (spec.md §7: "no error is silently swallowed").
    #[allow(clippy::too_many_arguments)]
    pub fn complete_task(
        &self,
        raw_task: impl Into<String>,
        refined_task: impl Into<String>,
        agent_type: Option<helix_core::AgentClass>,
        agent_image: Option<String>,
        tools_used: Vec<String>,
        outcome: Outcome,
        execution_time_ms: u64,
        summary: Option<String>,
        error: Option<String>,
    ) -> MemoryResult<Uuid> {
        let mut memory = TaskMemory::new(raw_task, refined_task);
        memory.agent_type = agent_type;
        memory.agent_image = agent_image;
        memory.tools_used = tools_used.clone();
        memory.outcome = outcome;
        memory.execution_time_ms = Some(execution_time_ms);
        memory.result_summary = summary;
        memory.error_message = error;

        let id = self.episodic.store(memory.clone(), self.embedder.as_ref())?;

        if let Some(agent_type) = memory.agent_type {
            self.semantic.update_from_execution(
                agent_type.as_str(),
                outcome,
                execution_time_ms,
                &tools_used,
                Some(&memory.refined_task),
                self.embedder.as_ref(),
            )?;
        }

        self.working.lock().expect("working memory mutex poisoned").clear_current_task();
        Ok(id)
    }

    pub fn store(&self, memory: TaskMemory) -> MemoryResult<Uuid> {
        self.episodic.store(memory, self.embedder.as_ref())
    }

    pub fn recall_by_id(&self, id: Uuid) -> MemoryResult<Option<TaskMemory>> {
        self.episodic.recall_by_id(id)
    }

    pub fn recall(&self, task: &str, limit: usize) -> MemoryResult<Vec<TaskMemory>> {
        let embedding = self.embedder.embed(task);
        self.episodic.recall_similar(&embedding, limit)
    }

    pub fn get_context_for_subagent(&self, task: &str, agent_type: Option<&str>) -> MemoryResult<ContextSlice> {
        let working = self.working.lock().expect("working memory mutex poisoned");
        context_slicer::slice_for_task(task, agent_type, &working, &self.episodic, &self.semantic, self.embedder.as_ref())
    }

    pub fn format_context_for_prompt(&self, task: &str, agent_type: Option<&str>) -> MemoryResult<String> {
        Ok(self.get_context_for_subagent(task, agent_type)?.format_for_prompt())
    }

    pub fn add_passive_transcription(&self, text: impl Into<String>) {
        self.working.lock().expect("working memory mutex poisoned").add_to_passive_buffer(text);
    }

    pub fn get_passive_buffer(&self) -> Vec<(DateTime<Utc>, String)> {
        self.working.lock().expect("working memory mutex poisoned").get_passive_buffer().to_vec()
    }

    /// Runs the lifecycle sweep if the minimum interval has elapsed since
    /// the last run, recording the new run time either way that it ran.
    pub fn run_lifecycle(&self) -> MemoryResult<Option<LifecycleStats>> {
        let mut last_run = self.last_lifecycle_run.lock().expect("lifecycle run mutex poisoned");
        if !LifecycleController::should_run(*last_run) {
            return Ok(None);
        }
        let current_task_embedding = {
            let working = self.working.lock().expect("working memory mutex poisoned");
            working.get_current_task().map(|t| self.embedder.embed(t))
        };
        let stats = self.lifecycle.run_pass(current_task_embedding.as_deref(), self.embedder.as_ref())?;
        *last_run = Some(Utc::now());
        Ok(Some(stats))
    }

    pub fn run_cleanup(&self) -> MemoryResult<CleanupStats> {
        Cleanup::new(self.db.clone()).run_full_cleanup(self.embedder.as_ref())
    }

    /// Folds every episodic entry for `agent_type` into its semantic
    /// aggregate, useful after a bulk import or when priming a fresh class.
    pub fn consolidate(&self, agent_type: &str) -> MemoryResult<u32> {
        let mut folded = 0;
        let matching = self.episodic.get_all()?.into_iter().filter(|m| {
            m.agent_type.map(|a| a.as_str() == agent_type).unwrap_or(false)
        });
        for memory in matching {
            self.semantic.update_from_execution(
                agent_type,
                memory.outcome,
                memory.execution_time_ms.unwrap_or(0),
                &memory.tools_used,
                Some(&memory.refined_task),
                self.embedder.as_ref(),
            )?;
            folded += 1;
        }
        Ok(folded)
    }

    pub fn get_agent_capability(&self, agent_type: &str) -> MemoryResult<Option<AgentCapability>> {
        self.semantic.recall_by_agent_type(agent_type)
    }

    pub fn get_stats(&self) -> MemoryResult<MemoryStats> {
        Ok(MemoryStats {
            episodic_count: self.episodic.get_all()?.len(),
            semantic_count: self.semantic.get_all()?.len(),
            encrypted: self.db.is_encrypted(),
        })
    }
}
