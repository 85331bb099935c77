//! Deterministic, side-effect-free task classifier. Grounded on spec.md
//! §4.2 "Classify" and the keyword groups implied by
//! `original_source/builder/schemas.py`'s five agent classes.

use crate::schemas::required_credentials;
use helix_core::AgentClass;

const QUESTION_WORDS: &[&str] = &["what", "why", "how", "when", "where", "who", "which"];

const RESEARCH_KEYWORDS: &[&str] = &["research", "history", "find out", "look up", "timeline", "investigate"];
const COMPUTE_KEYWORDS: &[&str] = &["calculate", "compute", "fibonacci", "factorial", "prime", "sum", "arithmetic", "math"];
const DATA_KEYWORDS: &[&str] = &["fetch data", "parse json", "parse csv", "transform data", "api call"];
const CODE_KEYWORDS: &[&str] = &["write code", "generate code", "create script", "implement"];
const SYNTHESIS_KEYWORDS: &[&str] = &["write a poem", "creative writing", "compose", "imagine"];

#[derive(Clone, Debug)]
pub struct Classification {
    pub class: AgentClass,
    pub required_credentials: Vec<String>,
    pub reason: String,
}

/// Matches `task` against priority-ordered keyword groups (research >
/// compute > data > code > synthesis); falls back to research when a
/// question word is present, else synthesis. Pure function: same input
/// always yields the same classification.
pub fn classify(task: &str) -> Classification {
    let task_lower = task.to_lowercase();

    let groups: &[(AgentClass, &[&str])] = &[
        (AgentClass::Research, RESEARCH_KEYWORDS),
        (AgentClass::Compute, COMPUTE_KEYWORDS),
        (AgentClass::Data, DATA_KEYWORDS),
        (AgentClass::Code, CODE_KEYWORDS),
        (AgentClass::Synthesis, SYNTHESIS_KEYWORDS),
    ];

    for (class, keywords) in groups {
        if let Some(kw) = keywords.iter().find(|kw| task_lower.contains(*kw)) {
            return make(*class, format!("matched keyword '{}'", kw));
        }
    }

    if QUESTION_WORDS.iter().any(|w| task_lower.contains(w)) {
        return make(AgentClass::Research, "default: question word present".to_string());
    }

    make(AgentClass::Synthesis, "default: no keyword or question word matched".to_string())
}

fn make(class: AgentClass, reason: String) -> Classification {
    Classification { class, required_credentials: required_credentials(class), reason }
}
