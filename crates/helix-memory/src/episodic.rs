//! Episodic tier: one row per completed task. Grounded on
//! `original_source/memory/episodic.py`.

use crate::db::Database;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{MemoryError, MemoryResult};
use crate::schemas::TaskMemory;
use chrono::Utc;
use rusqlite::params;
use std::sync::Arc;
use uuid::Uuid;

pub struct EpisodicMemory {
    db: Arc<Database>,
}

impl EpisodicMemory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn store(&self, mut memory: TaskMemory, embedder: &dyn Embedder) -> MemoryResult<Uuid> {
        if memory.meta.embedding.is_none() {
            memory.meta.embedding = Some(embedder.embed(&memory.refined_task));
        }
        let id = memory.meta.id;
        let embedding_blob = memory.meta.embedding.as_ref().map(encode_embedding);
        let data = serde_json::to_string(&memory)?;
        let agent_type = memory.agent_type.as_ref().map(|a| a.as_str());
        let outcome = serde_json::to_value(&memory.outcome)?;
        let outcome_str = outcome.as_str().unwrap_or("pending").to_string();

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO episodic_memories (id, created_at, last_accessed, access_count, agent_type, task_type, outcome, embedding, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET last_accessed=?3, access_count=?4, outcome=?7, embedding=?8, data=?9",
                params![
                    id.to_string(),
                    memory.meta.created_at.to_rfc3339(),
                    memory.meta.last_accessed.to_rfc3339(),
                    memory.meta.access_count,
                    agent_type,
                    memory.task_type,
                    outcome_str,
                    embedding_blob,
                    data,
                ],
            )
        })?;
        Ok(id)
    }

    pub fn recall_by_id(&self, id: Uuid) -> MemoryResult<Option<TaskMemory>> {
        let row = self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT data FROM episodic_memories WHERE id = ?1",
                params![id.to_string()],
                |r| r.get::<_, String>(0),
            )
        });
        match row {
            Ok(data) => {
                let memory = self.touch_and_parse(id, &data)?;
                Ok(Some(memory))
            }
            Err(MemoryError::Database(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Loads every row with a non-null embedding, scores by cosine
    /// similarity against `query_embedding`, and returns the top `limit`.
    pub fn recall_similar(&self, query_embedding: &[f32], limit: usize) -> MemoryResult<Vec<TaskMemory>> {
        let rows: Vec<(String, Vec<u8>)> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT data, embedding FROM episodic_memories WHERE embedding IS NOT NULL")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut scored: Vec<(f32, TaskMemory)> = rows
            .into_iter()
            .filter_map(|(data, emb_blob)| {
                let memory: TaskMemory = serde_json::from_str(&data).ok()?;
                let embedding = decode_embedding(&emb_blob);
                let score = cosine_similarity(query_embedding, &embedding);
                Some((score, memory))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let top: Vec<TaskMemory> = scored.into_iter().take(limit).map(|(_, m)| m).collect();
        for memory in &top {
            self.touch(memory.meta.id)?;
        }
        Ok(top)
    }

    pub fn recall_by_type(&self, task_type: &str, limit: usize) -> MemoryResult<Vec<TaskMemory>> {
        let rows: Vec<String> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT data FROM episodic_memories WHERE task_type = ?1 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![task_type, limit as i64], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|d| serde_json::from_str(&d).ok())
            .collect())
    }

    pub fn recall_recent(&self, limit: usize) -> MemoryResult<Vec<TaskMemory>> {
        let rows: Vec<String> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT data FROM episodic_memories ORDER BY created_at DESC LIMIT ?1")?;
            let rows = stmt
                .query_map(params![limit as i64], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|d| serde_json::from_str(&d).ok())
            .collect())
    }

    pub fn get_all(&self) -> MemoryResult<Vec<TaskMemory>> {
        let rows: Vec<String> = self.db.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT data FROM episodic_memories")?;
            let rows = stmt
                .query_map([], |r| r.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|d| serde_json::from_str(&d).ok())
            .collect())
    }

    pub fn delete(&self, id: Uuid) -> MemoryResult<()> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM episodic_memories WHERE id = ?1", params![id.to_string()])
        })?;
        Ok(())
    }

    fn touch(&self, id: Uuid) -> MemoryResult<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE episodic_memories SET last_accessed = ?1, access_count = access_count + 1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id.to_string()],
            )
        })?;
        Ok(())
    }

    fn touch_and_parse(&self, id: Uuid, data: &str) -> MemoryResult<TaskMemory> {
        self.touch(id)?;
        let mut memory: TaskMemory = serde_json::from_str(data)?;
        memory.meta.touch();
        Ok(memory)
    }
}

pub(crate) fn encode_embedding(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
