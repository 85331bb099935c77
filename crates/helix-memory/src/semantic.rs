//! Semantic tier: one row per agent class, an aggregate of everything
//! that class has ever done. Grounded on
//! `original_source/memory/semantic.py`.

use crate::db::Database;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::episodic::{decode_embedding, encode_embedding};
use crate::error::{MemoryError, MemoryResult};
use crate::schemas::AgentCapability;
use chrono::Utc;
use helix_core::Outcome;
use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

pub struct SemanticMemory {
    db: Arc<Database>,
}

impl SemanticMemory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn store(&self, mut capability: AgentCapability, embedder: &dyn Embedder) -> MemoryResult<Uuid> {
        if capability.meta.embedding.is_none() {
            capability.meta.embedding = Some(embedder.embed(&capability.description));
        }
        let id = capability.meta.id;
        let embedding_blob = capability.meta.embedding.as_ref().map(|e| encode_embedding(e));
        let data = serde_json::to_string(&capability)?;

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO semantic_memories (id, created_at, last_accessed, access_count, agent_type, embedding, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(agent_type) DO UPDATE SET last_accessed=?3, access_count=?4, embedding=?6, data=?7",
                params![
                    id.to_string(),
                    capability.meta.created_at.to_rfc3339(),
                    capability.meta.last_accessed.to_rfc3339(),
                    capability.meta.access_count,
                    capability.agent_type,
                    embedding_blob,
                    data,
                ],
            )
        })?;
        Ok(id)
    }

    pub fn recall_by_agent_type(&self, agent_type: &str) -> MemoryResult<Option<AgentCapability>> {
        let row = self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT data FROM semantic_memories WHERE agent_type = ?1",
                params![agent_type],
                |r| r.get::<_, String>(0),
            )
        });
        match row {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(MemoryError::Database(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn recall_similar(&self, query_embedding: &[f32], limit: usize) -> MemoryResult<Vec<AgentCapability>> {
        let rows: Vec<(String, Vec<u8>)> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT data, embedding FROM semantic_memories WHERE embedding IS NOT NULL")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut scored: Vec<(f32, AgentCapability)> = rows
            .into_iter()
            .filter_map(|(data, blob)| {
                let capability: AgentCapability = serde_json::from_str(&data).ok()?;
                let embedding = decode_embedding(&blob);
                let score = cosine_similarity(query_embedding, &embedding);
                Some((score, capability))
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(_, c)| c).collect())
    }

    pub fn get_all(&self) -> MemoryResult<Vec<AgentCapability>> {
        let rows: Vec<String> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT data FROM semantic_memories")?;
            let rows = stmt
                .query_map([], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        Ok(rows.into_iter().filter_map(|d| serde_json::from_str(&d).ok()).collect())
    }

    /// Folds the result of one task execution into the agent's running
    /// statistics: execution counters, a Welford-style running mean of
    /// execution time, and a capped recent-pattern/tool list.
    pub fn update_from_execution(
        &self,
        agent_type: &str,
        outcome: Outcome,
        execution_time_ms: u64,
        tools_used: &[String],
        task_pattern: Option<&str>,
        embedder: &dyn Embedder,
    ) -> MemoryResult<()> {
        let mut capability = self
            .recall_by_agent_type(agent_type)?
            .unwrap_or_else(|| AgentCapability::new(agent_type, format!("agent handling {} tasks", agent_type)));

        capability.total_executions += 1;
        if outcome.is_success() {
            capability.successful_executions += 1;
        }

        let n = capability.total_executions as f64;
        capability.avg_execution_time_ms =
            (capability.avg_execution_time_ms * (n - 1.0) + execution_time_ms as f64) / n;

        for tool in tools_used {
            if !capability.common_tools.contains(tool) {
                capability.common_tools.push(tool.clone());
            }
        }

        if outcome.is_success() {
            if let Some(pattern) = task_pattern {
                capability.task_patterns.push(truncate(pattern, 100));
                if capability.task_patterns.len() > 10 {
                    let excess = capability.task_patterns.len() - 10;
                    capability.task_patterns.drain(0..excess);
                }
            }
        }

        capability.meta.last_accessed = Utc::now();
        self.store(capability, embedder)?;
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> MemoryResult<()> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM semantic_memories WHERE id = ?1", params![id.to_string()])
        })?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::FallbackEmbedder;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, SemanticMemory) {
        let dir = tempdir().unwrap();
        let db = Arc::new(Database::open(Some(dir.path().join("memory.db"))).unwrap());
        (dir, SemanticMemory::new(db))
    }

    #[test]
    fn update_from_execution_creates_capability_on_first_run() {
        let (_dir, sem) = store();
        sem.update_from_execution("compute", Outcome::Success, 100, &["calculator".to_string()], Some("sum two numbers"), &FallbackEmbedder)
            .unwrap();

        let cap = sem.recall_by_agent_type("compute").unwrap().unwrap();
        assert_eq!(cap.total_executions, 1);
        assert_eq!(cap.successful_executions, 1);
        assert!((cap.avg_execution_time_ms - 100.0).abs() < 1e-6);
    }

    #[test]
    fn update_from_execution_running_mean() {
        let (_dir, sem) = store();
        sem.update_from_execution("compute", Outcome::Success, 100, &[], None, &FallbackEmbedder).unwrap();
        sem.update_from_execution("compute", Outcome::Failure, 300, &[], None, &FallbackEmbedder).unwrap();

        let cap = sem.recall_by_agent_type("compute").unwrap().unwrap();
        assert_eq!(cap.total_executions, 2);
        assert_eq!(cap.successful_executions, 1);
        assert!((cap.avg_execution_time_ms - 200.0).abs() < 1e-6);
    }

    #[test]
    fn task_patterns_capped_at_ten() {
        let (_dir, sem) = store();
        for i in 0..15 {
            sem.update_from_execution("compute", Outcome::Success, 10, &[], Some(&format!("pattern {}", i)), &FallbackEmbedder)
                .unwrap();
        }
        let cap = sem.recall_by_agent_type("compute").unwrap().unwrap();
        assert_eq!(cap.task_patterns.len(), 10);
        assert_eq!(cap.task_patterns.last().unwrap(), "pattern 14");
    }

    #[test]
    fn only_successful_outcomes_contribute_task_patterns() {
        let (_dir, sem) = store();
        sem.update_from_execution("research", Outcome::Failure, 10, &[], Some("failed pattern"), &FallbackEmbedder).unwrap();
        sem.update_from_execution("research", Outcome::Partial, 10, &[], Some("partial pattern"), &FallbackEmbedder).unwrap();
        sem.update_from_execution("research", Outcome::Success, 10, &[], Some("good pattern"), &FallbackEmbedder).unwrap();

        let cap = sem.recall_by_agent_type("research").unwrap().unwrap();
        assert_eq!(cap.task_patterns, vec!["good pattern".to_string()]);
        assert_eq!(cap.total_executions, 3);
    }

    #[test]
    fn common_tools_deduplicated() {
        let (_dir, sem) = store();
        sem.update_from_execution("compute", Outcome::Success, 10, &["calc".to_string()], None, &FallbackEmbedder).unwrap();
        sem.update_from_execution("compute", Outcome::Success, 10, &["calc".to_string(), "search".to_string()], None, &FallbackEmbedder).unwrap();
        let cap = sem.recall_by_agent_type("compute").unwrap().unwrap();
        assert_eq!(cap.common_tools, vec!["calc".to_string(), "search".to_string()]);
    }
}
