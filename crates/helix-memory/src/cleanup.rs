//! Retention sweep: archives old episodic memories, prunes stale low
//! performing semantic capabilities, and reclaims local container images
//! nothing successful has referenced recently. Grounded on
//! `original_source/memory/cleanup.py`.

use crate::db::Database;
use crate::embeddings::Embedder;
use crate::episodic::EpisodicMemory;
use crate::error::MemoryResult;
use crate::lifecycle::LifecycleController;
use crate::semantic::SemanticMemory;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::process::Command;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;
const STALE_SUCCESS_RATE_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default)]
pub struct CleanupStats {
    pub archived: u32,
    pub stale_patterns_removed: u32,
    pub images_removed: u32,
}

pub struct Cleanup {
    episodic: EpisodicMemory,
    semantic: SemanticMemory,
    lifecycle: LifecycleController,
    retention_days: i64,
}

impl Cleanup {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            episodic: EpisodicMemory::new(db.clone()),
            semantic: SemanticMemory::new(db.clone()),
            lifecycle: LifecycleController::new(db),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn run_full_cleanup(&self, _embedder: &dyn Embedder) -> MemoryResult<CleanupStats> {
        let mut stats = CleanupStats::default();
        stats.archived = self.archive_old_memories()?;
        stats.stale_patterns_removed = self.cleanup_stale_patterns()?;
        stats.images_removed = self.cleanup_docker_images()?;
        Ok(stats)
    }

    /// Archives episodic entries past the retention cutoff outright,
    /// regardless of how they would score in a lifecycle pass.
    fn archive_old_memories(&self) -> MemoryResult<u32> {
        let cutoff = Utc::now() - ChronoDuration::days(self.retention_days);
        let mut archived = 0;
        for entry in self.episodic.get_all()? {
            if entry.meta.last_accessed < cutoff {
                self.lifecycle.archive_and_remove_episodic(&entry)?;
                archived += 1;
            }
        }
        Ok(archived)
    }

    fn cleanup_stale_patterns(&self) -> MemoryResult<u32> {
        let cutoff = Utc::now() - ChronoDuration::days(self.retention_days);
        let mut removed = 0;
        for capability in self.semantic.get_all()? {
            let stale = capability.meta.last_accessed < cutoff;
            let low_success = capability.success_rate() < STALE_SUCCESS_RATE_THRESHOLD && capability.total_executions > 0;
            if stale && low_success {
                self.semantic.delete(capability.meta.id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn cleanup_docker_images(&self) -> MemoryResult<u32> {
        let output = match Command::new("docker")
            .args(["images", "--filter", "reference=helix-*", "--format", "{{.Repository}}:{{.Tag}}\t{{.CreatedAt}}"])
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                warn!("docker not available, skipping image cleanup: {}", e);
                return Ok(0);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let cutoff = Utc::now() - ChronoDuration::days(self.retention_days);
        let mut removed = 0;

        for line in stdout.lines() {
            let Some((reference, created_at)) = line.split_once('\t') else { continue };
            let Some(created) = parse_docker_created_at(created_at) else { continue };
            if created >= cutoff {
                continue;
            }
            if self.image_in_use(reference)? {
                continue;
            }
            if Command::new("docker").args(["rmi", reference]).status().map(|s| s.success()).unwrap_or(false) {
                info!("removed cold image {}", reference);
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn image_in_use(&self, reference: &str) -> MemoryResult<bool> {
        let cutoff = Utc::now() - ChronoDuration::days(self.retention_days);
        for entry in self.episodic.get_all()? {
            if entry.agent_image.as_deref() == Some(reference)
                && entry.outcome.is_success()
                && entry.meta.last_accessed >= cutoff
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn parse_docker_created_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S %z %Z")
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_docker_created_at_format() {
        let parsed = parse_docker_created_at("2026-01-01 12:00:00 +0000 UTC");
        assert!(parsed.is_some());
    }

    #[test]
    fn rejects_malformed_created_at() {
        assert!(parse_docker_created_at("not a date").is_none());
    }
}
