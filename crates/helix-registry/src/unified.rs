//! Search wrapper over both the container and WASM registries. Grounded
//! on `original_source/builder/unified_registry.py::UnifiedAgentRegistry`.

use crate::container::ContainerRegistry;
use crate::stem::score_candidate;
use crate::types::AgentMatch;
use crate::wasm::WasmRegistry;
use helix_core::RuntimeBackend;

const CONTAINER_THRESHOLD: f32 = 0.2;
/// Cross-runtime tie-break margin: within this distance, WASM wins for its
/// near-zero cold start. Spec.md §9 Open Question (b) calls this a policy
/// knob; kept configurable via `with_tie_break_margin` rather than a bare
/// constant.
const DEFAULT_TIE_BREAK_MARGIN: f32 = 0.1;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub struct UnifiedRegistry {
    container: ContainerRegistry,
    wasm: WasmRegistry,
    tie_break_margin: f32,
}

impl UnifiedRegistry {
    pub fn new(container: ContainerRegistry, wasm: WasmRegistry) -> Self {
        Self { container, wasm, tie_break_margin: DEFAULT_TIE_BREAK_MARGIN }
    }

    pub fn with_tie_break_margin(mut self, margin: f32) -> Self {
        self.tie_break_margin = margin;
        self
    }

    /// Searches both backends and returns the best cross-runtime match, if
    /// either scored above its own threshold.
    pub async fn search(&self, task_description: &str) -> Option<AgentMatch> {
        let container_match = self.search_container(task_description).await;
        let wasm_match = self.search_wasm(task_description, None, 1.0);

        match (container_match, wasm_match) {
            (None, None) => None,
            (Some(c), None) => Some(c),
            (None, Some(w)) => Some(w),
            (Some(c), Some(w)) => Some(self.pick_best(c, w)),
        }
    }

    /// Like `search`, but lets the caller supply a query embedding for the
    /// WASM backend's hybrid keyword+semantic scoring.
    pub async fn search_hybrid(&self, task_description: &str, query_embedding: Option<&[f32]>, alpha: f32) -> Option<AgentMatch> {
        let container_match = self.search_container(task_description).await;
        let wasm_match = self.search_wasm(task_description, query_embedding, alpha);

        match (container_match, wasm_match) {
            (None, None) => None,
            (Some(c), None) => Some(c),
            (None, Some(w)) => Some(w),
            (Some(c), Some(w)) => Some(self.pick_best(c, w)),
        }
    }

    async fn search_container(&self, task_description: &str) -> Option<AgentMatch> {
        let agents = self.container.list_agents().await.ok()?;
        if agents.is_empty() {
            return None;
        }

        let mut best: Option<(String, f32, crate::types::AgentLabels)> = None;
        for agent in agents {
            let Ok(labels) = self.container.get_agent_metadata(&agent, "latest").await else {
                continue;
            };
            if labels.task.is_empty() {
                continue;
            }
            let score = score_candidate(task_description, &labels.task, &agent);
            if best.as_ref().map(|(_, s, _)| score > *s).unwrap_or(true) {
                best = Some((agent, score, labels));
            }
        }

        let (name, score, labels) = best?;
        if score < CONTAINER_THRESHOLD {
            return None;
        }

        Some(AgentMatch {
            name: name.clone(),
            runtime: RuntimeBackend::Container,
            reference: format!("{}:latest", name),
            score,
            task: labels.task,
            capabilities: labels.capabilities_list(),
        })
    }

    fn search_wasm(&self, task_description: &str, query_embedding: Option<&[f32]>, alpha: f32) -> Option<AgentMatch> {
        let (name, score) = self.wasm.semantic_search(task_description, query_embedding, alpha)?;
        let manifest = self.wasm.get_manifest(&name)?;
        let reference = self.wasm.get_wasm_path(&name).map(|p| p.display().to_string()).unwrap_or_else(|| name.clone());

        Some(AgentMatch {
            name,
            runtime: RuntimeBackend::Wasm,
            reference,
            score,
            task: manifest.task,
            capabilities: manifest.capabilities,
        })
    }

    /// Tie-break: a `> margin` lead wins outright; otherwise WASM wins for
    /// its lower cold-start cost (spec.md §4.3 "Cross-runtime arbitration").
    fn pick_best(&self, container: AgentMatch, wasm: AgentMatch) -> AgentMatch {
        let diff = container.score - wasm.score;
        if diff > self.tie_break_margin {
            container
        } else if diff < -self.tie_break_margin {
            wasm
        } else {
            wasm
        }
    }

    pub fn wasm_registry(&self) -> &WasmRegistry {
        &self.wasm
    }

    pub fn container_registry(&self) -> &ContainerRegistry {
        &self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wasm::WasmManifest;
    use tempfile::tempdir;

    fn wasm_manifest(name: &str, task: &str) -> WasmManifest {
        WasmManifest {
            name: name.to_string(),
            task: task.to_string(),
            runtime: "wasm".to_string(),
            capabilities: vec![],
            created: "2026-01-01T00:00:00Z".to_string(),
            wasm_file: "agent.wasm".to_string(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn wasm_only_match_is_returned_when_container_empty() {
        let dir = tempdir().unwrap();
        let wasm = WasmRegistry::new(dir.path()).unwrap();
        wasm.store("helix-compute-1", b"\0asm", &wasm_manifest("helix-compute-1", "calculate exact mathematical computations")).unwrap();

        let registry = UnifiedRegistry::new(ContainerRegistry::new("http://localhost:1"), wasm);
        let result = registry.search("calculate mathematical computation").await;
        assert!(result.is_some());
        assert_eq!(result.unwrap().runtime, RuntimeBackend::Wasm);
    }

    #[test]
    fn tie_break_prefers_wasm_within_margin() {
        let dir = tempdir().unwrap();
        let wasm = WasmRegistry::new(dir.path()).unwrap();
        let registry = UnifiedRegistry::new(ContainerRegistry::new("http://localhost:1"), wasm);

        let container = AgentMatch {
            name: "c".to_string(),
            runtime: RuntimeBackend::Container,
            reference: "c:latest".to_string(),
            score: 0.55,
            task: "t".to_string(),
            capabilities: vec![],
        };
        let wasm_match = AgentMatch {
            name: "w".to_string(),
            runtime: RuntimeBackend::Wasm,
            reference: "w".to_string(),
            score: 0.5,
            task: "t".to_string(),
            capabilities: vec![],
        };
        let best = registry.pick_best(container, wasm_match);
        assert_eq!(best.runtime, RuntimeBackend::Wasm);
    }

    #[test]
    fn decisive_lead_wins_outright() {
        let dir = tempdir().unwrap();
        let wasm = WasmRegistry::new(dir.path()).unwrap();
        let registry = UnifiedRegistry::new(ContainerRegistry::new("http://localhost:1"), wasm);

        let container = AgentMatch {
            name: "c".to_string(),
            runtime: RuntimeBackend::Container,
            reference: "c:latest".to_string(),
            score: 0.9,
            task: "t".to_string(),
            capabilities: vec![],
        };
        let wasm_match = AgentMatch {
            name: "w".to_string(),
            runtime: RuntimeBackend::Wasm,
            reference: "w".to_string(),
            score: 0.3,
            task: "t".to_string(),
            capabilities: vec![],
        };
        let best = registry.pick_best(container, wasm_match);
        assert_eq!(best.runtime, RuntimeBackend::Container);
    }
}
