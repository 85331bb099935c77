//! Assembles a bounded slice of past experience into prompt text for the
//! generator. Grounded on `original_source/memory/context_slicer.py` —
//! the section headers below are reproduced verbatim so the generated
//! prompt text matches what the original system actually emitted.

use crate::embeddings::Embedder;
use crate::episodic::EpisodicMemory;
use crate::error::MemoryResult;
use crate::schemas::AgentCapability;
use crate::semantic::SemanticMemory;
use crate::working::WorkingMemory;
use helix_core::Outcome;

const SIMILAR_TASKS_LIMIT: usize = 3;
const SEMANTIC_LIMIT: usize = 2;
const PATTERNS_PER_CAPABILITY: usize = 3;
const TOOLS_PER_CAPABILITY: usize = 3;
const SUGGESTED_TOOLS_LIMIT: usize = 5;
const RECENT_CONVERSATION_LIMIT: usize = 2;
const TEXT_PREVIEW_CHARS: usize = 100;

pub struct SimilarTask {
    pub task: String,
    pub approach: Option<String>,
    pub tools_used: Vec<String>,
}

pub struct ContextSlice {
    pub similar_tasks: Vec<SimilarTask>,
    pub relevant_patterns: Vec<String>,
    pub suggested_tools: Vec<String>,
    pub agent_capability: Option<AgentCapability>,
    pub recent_conversation: Vec<(String, String)>,
}

pub fn slice_for_task(
    task: &str,
    agent_type: Option<&str>,
    working: &WorkingMemory,
    episodic: &EpisodicMemory,
    semantic: &SemanticMemory,
    embedder: &dyn Embedder,
) -> MemoryResult<ContextSlice> {
    let query_embedding = embedder.embed(task);

    let similar_tasks: Vec<SimilarTask> = episodic
        .recall_similar(&query_embedding, SIMILAR_TASKS_LIMIT * 2)?
        .into_iter()
        .filter(|m| m.outcome == Outcome::Success)
        .take(SIMILAR_TASKS_LIMIT)
        .map(|m| SimilarTask {
            task: m.refined_task,
            approach: m.result_summary,
            tools_used: m.tools_used,
        })
        .collect();

    let mut relevant_patterns = Vec::new();
    let mut suggested_tools = Vec::new();
    for capability in semantic.recall_similar(&query_embedding, SEMANTIC_LIMIT)? {
        relevant_patterns.extend(capability.task_patterns.iter().take(PATTERNS_PER_CAPABILITY).cloned());
        for tool in capability.common_tools.iter().take(TOOLS_PER_CAPABILITY) {
            if !suggested_tools.contains(tool) {
                suggested_tools.push(tool.clone());
            }
        }
    }

    let agent_capability = match agent_type {
        Some(t) => semantic.recall_by_agent_type(t)?,
        None => None,
    };

    let recent_conversation: Vec<(String, String)> = working
        .get_conversation_history()
        .iter()
        .rev()
        .take(RECENT_CONVERSATION_LIMIT)
        .rev()
        .cloned()
        .collect();

    Ok(ContextSlice {
        similar_tasks,
        relevant_patterns,
        suggested_tools,
        agent_capability,
        recent_conversation,
    })
}

fn truncate_preview(s: &str) -> String {
    if s.chars().count() <= TEXT_PREVIEW_CHARS {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(TEXT_PREVIEW_CHARS).collect();
        out.push_str("...");
        out
    }
}

impl ContextSlice {
    pub fn is_empty(&self) -> bool {
        self.similar_tasks.is_empty()
            && self.relevant_patterns.is_empty()
            && self.suggested_tools.is_empty()
            && self.agent_capability.is_none()
            && self.recent_conversation.is_empty()
    }

    pub fn format_for_prompt(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::from("## Context from Previous Experience\n\n");

        if !self.similar_tasks.is_empty() {
            out.push_str("### Similar Past Tasks:\n");
            for task in &self.similar_tasks {
                out.push_str(&format!("- Task: {}\n", truncate_preview(&task.task)));
                if let Some(approach) = &task.approach {
                    out.push_str(&format!("  Approach: {}\n", truncate_preview(approach)));
                }
            }
            out.push('\n');
        }

        if !self.relevant_patterns.is_empty() {
            out.push_str("### Known Patterns:\n");
            for pattern in &self.relevant_patterns {
                out.push_str(&format!("- {}\n", pattern));
            }
            out.push('\n');
        }

        if !self.suggested_tools.is_empty() {
            let tools = self.suggested_tools.iter().take(SUGGESTED_TOOLS_LIMIT).cloned().collect::<Vec<_>>().join(", ");
            out.push_str(&format!("### Suggested Tools: {}\n\n", tools));
        }

        if let Some(cap) = &self.agent_capability {
            out.push_str(&format!(
                "### Agent Stats: {:.0}% success rate, avg {:.0}ms\n\n",
                cap.success_rate() * 100.0,
                cap.avg_execution_time_ms
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_formats_to_empty_string() {
        let slice = ContextSlice {
            similar_tasks: vec![],
            relevant_patterns: vec![],
            suggested_tools: vec![],
            agent_capability: None,
            recent_conversation: vec![],
        };
        assert_eq!(slice.format_for_prompt(), "");
    }

    #[test]
    fn formats_expected_section_headers() {
        let slice = ContextSlice {
            similar_tasks: vec![SimilarTask {
                task: "sort a list".to_string(),
                approach: Some("used quicksort".to_string()),
                tools_used: vec!["sort_tool".to_string()],
            }],
            relevant_patterns: vec!["use quicksort for large inputs".to_string()],
            suggested_tools: vec!["sort_tool".to_string()],
            agent_capability: None,
            recent_conversation: vec![],
        };
        let text = slice.format_for_prompt();
        assert!(text.starts_with("## Context from Previous Experience"));
        assert!(text.contains("### Similar Past Tasks:"));
        assert!(text.contains("- Task: sort a list"));
        assert!(text.contains("  Approach: used quicksort"));
        assert!(text.contains("### Known Patterns:"));
        assert!(text.contains("### Suggested Tools: sort_tool"));
    }

    #[test]
    fn agent_stats_section_renders_success_rate() {
        let mut cap = AgentCapability::new("compute", "handles compute tasks");
        cap.total_executions = 4;
        cap.successful_executions = 3;
        cap.avg_execution_time_ms = 120.0;
        let slice = ContextSlice {
            similar_tasks: vec![],
            relevant_patterns: vec![],
            suggested_tools: vec![],
            agent_capability: Some(cap),
            recent_conversation: vec![],
        };
        let text = slice.format_for_prompt();
        assert!(text.contains("### Agent Stats: 75% success rate"));
    }

    #[test]
    fn long_task_text_is_truncated_with_ellipsis() {
        let long_task = "a".repeat(150);
        assert_eq!(truncate_preview(&long_task).len(), TEXT_PREVIEW_CHARS + 3);
    }
}
