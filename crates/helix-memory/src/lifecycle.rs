//! Tier-transition scoring and sweep. Grounded on
//! `original_source/memory/lifecycle_controller.py`.

use crate::db::Database;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::episodic::EpisodicMemory;
use crate::semantic::SemanticMemory;
use crate::error::MemoryResult;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rusqlite::params;
use std::io::Write;
use std::sync::Arc;
use uuid::Uuid;

pub const WORKING_THRESHOLD: f64 = 0.7;
pub const EPISODIC_THRESHOLD: f64 = 0.4;
pub const SEMANTIC_THRESHOLD: f64 = 0.2;

const RECENCY_DECAY_DAYS: f64 = 7.0;
const DEFAULT_RUN_INTERVAL_MINUTES: i64 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub evaluated: u32,
    pub promoted: u32,
    pub demoted: u32,
    pub archived: u32,
    pub deleted: u32,
}

/// Score in [0, 1] combining recency, access frequency, relevance to the
/// current working task, and historical outcome quality. Weights and the
/// exponential recency decay match the original controller exactly.
pub fn calculate_lifecycle_score(
    last_accessed: DateTime<Utc>,
    access_count: u32,
    embedding: Option<&[f32]>,
    current_task_embedding: Option<&[f32]>,
    success_rate: f64,
) -> f64 {
    let age_days = (Utc::now() - last_accessed).num_seconds() as f64 / 86_400.0;
    let recency = (-age_days.max(0.0) / RECENCY_DECAY_DAYS).exp();

    let frequency = (access_count as f64 / 10.0).min(1.0);

    let relevance = calculate_relevance(embedding, current_task_embedding);

    0.3 * recency + 0.2 * frequency + 0.3 * relevance + 0.2 * success_rate
}

fn calculate_relevance(embedding: Option<&[f32]>, current_task_embedding: Option<&[f32]>) -> f64 {
    match (embedding, current_task_embedding) {
        (Some(a), Some(b)) => cosine_similarity(a, b) as f64,
        _ => 0.5,
    }
}

pub fn score_to_tier(score: f64) -> &'static str {
    if score >= WORKING_THRESHOLD {
        "working"
    } else if score >= EPISODIC_THRESHOLD {
        "episodic"
    } else if score >= SEMANTIC_THRESHOLD {
        "semantic"
    } else {
        "archive"
    }
}

pub struct LifecycleController {
    db: Arc<Database>,
    episodic: EpisodicMemory,
    semantic: SemanticMemory,
}

impl LifecycleController {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            episodic: EpisodicMemory::new(db.clone()),
            semantic: SemanticMemory::new(db.clone()),
            db,
        }
    }

    /// Whether enough time has passed since `last_run` to run another
    /// pass, using the default 5-minute interval.
    pub fn should_run(last_run: Option<DateTime<Utc>>) -> bool {
        match last_run {
            None => true,
            Some(t) => Utc::now() - t >= ChronoDuration::minutes(DEFAULT_RUN_INTERVAL_MINUTES),
        }
    }

    /// Scores every episodic entry and demotes low scorers to the archive,
    /// distilling a pattern into the semantic tier first.
    pub fn run_pass(&self, current_task_embedding: Option<&[f32]>, embedder: &dyn Embedder) -> MemoryResult<LifecycleStats> {
        let mut stats = LifecycleStats::default();
        let entries = self.episodic.get_all()?;

        for entry in entries {
            stats.evaluated += 1;
            let score = calculate_lifecycle_score(
                entry.meta.last_accessed,
                entry.meta.access_count,
                entry.meta.embedding.as_deref(),
                current_task_embedding,
                entry.success_rate(),
            );
            let target_tier = score_to_tier(score);

            match target_tier {
                "working" | "episodic" => {
                    // Stays put; nothing to transition.
                }
                "semantic" => {
                    if let Some(agent_type) = entry.agent_type.as_ref().map(|a| a.as_str()) {
                        self.semantic.update_from_execution(
                            agent_type,
                            entry.outcome,
                            entry.execution_time_ms.unwrap_or(0),
                            &entry.tools_used,
                            Some(&entry.refined_task),
                            embedder,
                        )?;
                        stats.demoted += 1;
                    }
                }
                _ => {
                    self.archive(entry.meta.id, "episodic", &entry)?;
                    self.episodic.delete(entry.meta.id)?;
                    stats.archived += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Archives a single episodic entry and removes it, independent of its
    /// lifecycle score. Used by the retention sweep for entries that are
    /// simply too old, regardless of how relevant they still score.
    pub fn archive_and_remove_episodic(&self, entry: &crate::schemas::TaskMemory) -> MemoryResult<()> {
        self.archive(entry.meta.id, "episodic", entry)?;
        self.episodic.delete(entry.meta.id)
    }

    pub(crate) fn archive<T: serde::Serialize>(&self, id: Uuid, source_tier: &str, payload: &T) -> MemoryResult<()> {
        let json = serde_json::to_vec(payload)?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO archived_memories (id, archived_at, source_tier, compressed) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), Utc::now().to_rfc3339(), source_tier, compressed],
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_to_tier_boundaries() {
        assert_eq!(score_to_tier(0.9), "working");
        assert_eq!(score_to_tier(0.7), "working");
        assert_eq!(score_to_tier(0.69), "episodic");
        assert_eq!(score_to_tier(0.4), "episodic");
        assert_eq!(score_to_tier(0.39), "semantic");
        assert_eq!(score_to_tier(0.2), "semantic");
        assert_eq!(score_to_tier(0.1), "archive");
    }

    #[test]
    fn fresh_frequently_accessed_relevant_successful_entry_scores_high() {
        let embedding = vec![1.0, 0.0, 0.0];
        let score = calculate_lifecycle_score(Utc::now(), 20, Some(&embedding), Some(&embedding), 1.0);
        assert!(score > 0.9, "expected high score, got {}", score);
    }

    #[test]
    fn old_rarely_accessed_entry_scores_low() {
        let old = Utc::now() - ChronoDuration::days(60);
        let score = calculate_lifecycle_score(old, 0, None, None, 0.0);
        assert!(score < 0.3, "expected low score, got {}", score);
    }

    #[test]
    fn should_run_true_when_never_run() {
        assert!(LifecycleController::should_run(None));
    }

    #[test]
    fn should_run_false_immediately_after() {
        assert!(!LifecycleController::should_run(Some(Utc::now())));
    }

    #[test]
    fn should_run_true_after_interval_elapsed() {
        let past = Utc::now() - ChronoDuration::minutes(10);
        assert!(LifecycleController::should_run(Some(past)));
    }
}
