//! Refine stage: rewrites the raw user request as a precise task spec via
//! an LLM call. Grounded on spec.md §4.2 "Refine".

use helix_llm::ModelRouter;
use std::time::Duration;
use tracing::warn;

const REFINE_TIMEOUT: Duration = Duration::from_secs(60);

/// Asks the router to rewrite `raw_task` as an unambiguous task spec. On
/// LLM failure (every candidate in the router exhausted) this is
/// non-fatal: the raw task is returned unchanged, matching spec.md's
/// "fall back to the raw task unchanged (non-fatal)".
pub async fn refine(router: &ModelRouter, raw_task: &str) -> String {
    let prompt = format!(
        "Rewrite the following user request as a precise, unambiguous task \
         specification. Output only the rewritten task, nothing else.\n\n\
         Request: {}",
        raw_task
    );

    match router.complete(&prompt, REFINE_TIMEOUT).await {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                raw_task.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            warn!(error = %e, "refine stage exhausted all models, falling back to raw task");
            raw_task.to_string()
        }
    }
}
