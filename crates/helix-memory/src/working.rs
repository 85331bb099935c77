//! Working tier: session-scoped, in-memory, never persisted directly.
//! Grounded on `original_source/memory/working.py`.

use crate::schemas::WorkingContext;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;

const CONVERSATION_HISTORY_CAP: usize = 20;

pub struct WorkingMemory {
    context: WorkingContext,
    temp_store: HashMap<String, serde_json::Value>,
}

impl WorkingMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            context: WorkingContext::new(session_id),
            temp_store: HashMap::new(),
        }
    }

    /// Same as `new`, but with an explicit passive-buffer window instead of
    /// the default 5 minutes (spec.md §3, `HELIX_MEMORY_BUFFER_MINUTES`).
    pub fn with_buffer_minutes(session_id: impl Into<String>, buffer_minutes: i64) -> Self {
        Self {
            context: WorkingContext::with_buffer_minutes(session_id, buffer_minutes),
            temp_store: HashMap::new(),
        }
    }

    pub fn set_current_task(&mut self, task: impl Into<String>) {
        self.context.current_task = Some(task.into());
    }

    pub fn get_current_task(&self) -> Option<&str> {
        self.context.current_task.as_deref()
    }

    pub fn clear_current_task(&mut self) {
        self.context.current_task = None;
    }

    pub fn add_conversation(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.context.conversation_history.push((role.into(), content.into()));
        if self.context.conversation_history.len() > CONVERSATION_HISTORY_CAP {
            let excess = self.context.conversation_history.len() - CONVERSATION_HISTORY_CAP;
            self.context.conversation_history.drain(0..excess);
        }
    }

    pub fn get_conversation_history(&self) -> &[(String, String)] {
        &self.context.conversation_history
    }

    pub fn add_to_passive_buffer(&mut self, text: impl Into<String>) {
        self.context.passive_buffer.push((Utc::now(), text.into()));
        self.cleanup_buffer();
    }

    pub fn get_passive_buffer(&mut self) -> &[(chrono::DateTime<Utc>, String)] {
        self.cleanup_buffer();
        &self.context.passive_buffer
    }

    fn cleanup_buffer(&mut self) {
        let cutoff = Utc::now() - ChronoDuration::minutes(self.context.passive_buffer_max_minutes);
        self.context.passive_buffer.retain(|(ts, _)| *ts >= cutoff);
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.context_variables.insert(key.into(), value);
    }

    pub fn get_variable(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.context_variables.get(key)
    }

    pub fn store(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.temp_store.insert(key.into(), value);
    }

    pub fn recall(&self, key: &str) -> Option<&serde_json::Value> {
        self.temp_store.get(key)
    }

    pub fn get_full_context(&self) -> &WorkingContext {
        &self.context
    }

    pub fn clear(&mut self) {
        let session_id = self.context.session_id.clone();
        self.context = WorkingContext::new(session_id);
        self.temp_store.clear();
    }
}
