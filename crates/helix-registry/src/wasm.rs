//! Filesystem-backed WASM registry. Grounded on
//! `original_source/builder/wasm_registry.py`: one directory per agent,
//! holding `agent.wasm` and `manifest.json`; both must exist for the
//! agent to be listed.

use crate::error::RegistryResult;
use crate::stem::{jaccard, score_candidate, stemmed_keywords};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_WASM_FILE: &str = "agent.wasm";
const MATCH_THRESHOLD: f32 = 0.2;

/// Metadata for a WASM module, written alongside the binary as
/// `manifest.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WasmManifest {
    pub name: String,
    pub task: String,
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default = "default_wasm_file")]
    pub wasm_file: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

fn default_runtime() -> String {
    "wasm".to_string()
}

fn default_wasm_file() -> String {
    DEFAULT_WASM_FILE.to_string()
}

pub struct WasmRegistry {
    root: PathBuf,
}

impl WasmRegistry {
    pub fn new(root: impl Into<PathBuf>) -> RegistryResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Agent names whose directory carries both a manifest and a binary —
    /// a partial write (one present, one missing) is never surfaced.
    pub fn list_agents(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let manifest_path = path.join("manifest.json");
            let wasm_path = path.join(DEFAULT_WASM_FILE);
            if manifest_path.exists() && wasm_path.exists() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names
    }

    pub fn get_manifest(&self, agent_name: &str) -> Option<WasmManifest> {
        let path = self.root.join(agent_name).join("manifest.json");
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    pub fn get_wasm_path(&self, agent_name: &str) -> Option<PathBuf> {
        let manifest = self.get_manifest(agent_name)?;
        let path = self.root.join(agent_name).join(&manifest.wasm_file);
        path.exists().then_some(path)
    }

    pub fn get_wasm_binary(&self, agent_name: &str) -> RegistryResult<Option<Vec<u8>>> {
        match self.get_wasm_path(agent_name) {
            Some(path) => Ok(Some(fs::read(path)?)),
            None => Ok(None),
        }
    }

    /// Stores a WASM binary and its manifest. Writes the binary first,
    /// then the manifest last — so a reader never observes a manifest
    /// with no backing binary, matching the "visible to search only
    /// when both are present" invariant.
    pub fn store(&self, agent_name: &str, wasm_binary: &[u8], manifest: &WasmManifest) -> RegistryResult<PathBuf> {
        let agent_dir = self.root.join(agent_name);
        fs::create_dir_all(&agent_dir)?;

        let wasm_path = agent_dir.join(&manifest.wasm_file);
        fs::write(&wasm_path, wasm_binary)?;

        let manifest_path = agent_dir.join("manifest.json");
        fs::write(&manifest_path, serde_json::to_vec_pretty(manifest)?)?;

        Ok(wasm_path)
    }

    pub fn delete(&self, agent_name: &str) -> RegistryResult<bool> {
        let agent_dir = self.root.join(agent_name);
        if agent_dir.exists() {
            fs::remove_dir_all(&agent_dir)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Keyword-only search: stemmed Jaccard plus the class-keyword bonus,
    /// thresholded at 0.2. Returns the best-scoring agent name.
    pub fn search(&self, task_description: &str) -> Option<(String, f32)> {
        let mut best: Option<(String, f32)> = None;
        for agent in self.list_agents() {
            let Some(manifest) = self.get_manifest(&agent) else {
                continue;
            };
            if manifest.task.is_empty() {
                continue;
            }
            let score = score_candidate(task_description, &manifest.task, &agent);
            if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                best = Some((agent, score));
            }
        }
        best.filter(|(_, score)| *score >= MATCH_THRESHOLD)
    }

    /// Hybrid keyword+semantic search: `score = alpha*jaccard +
    /// (1-alpha)*cosine`. When `query_embedding` is `None` alpha is forced
    /// to 1.0 (keyword-only), per spec.md §4.3.
    pub fn semantic_search(
        &self,
        task_description: &str,
        query_embedding: Option<&[f32]>,
        alpha: f32,
    ) -> Option<(String, f32)> {
        let alpha = if query_embedding.is_some() { alpha.clamp(0.0, 1.0) } else { 1.0 };
        let task_keywords = stemmed_keywords(task_description);
        let task_lower = task_description.to_lowercase();

        let mut best: Option<(String, f32)> = None;
        for agent in self.list_agents() {
            let Some(manifest) = self.get_manifest(&agent) else {
                continue;
            };
            if manifest.task.is_empty() {
                continue;
            }

            let agent_keywords = stemmed_keywords(&manifest.task);
            let mut keyword_score = jaccard(&task_keywords, &agent_keywords);
            let name_lower = agent.to_lowercase();
            for kw in ["research", "compute", "data", "code", "synthesis", "math", "text"] {
                if task_lower.contains(kw) && name_lower.contains(kw) {
                    keyword_score += 0.3;
                    break;
                }
            }
            if name_lower.starts_with("helix-") {
                keyword_score += 0.5;
            }

            let semantic_score = match (query_embedding, &manifest.embedding) {
                (Some(q), Some(e)) => crate::unified::cosine_similarity(q, e),
                _ => 0.0,
            };

            let combined = alpha * keyword_score + (1.0 - alpha) * semantic_score;
            if best.as_ref().map(|(_, s)| combined > *s).unwrap_or(true) {
                best = Some((agent, combined));
            }
        }
        best.filter(|(_, score)| *score >= MATCH_THRESHOLD)
    }
}

/// Validates the WASM magic bytes header (`\0asm`), the original's own
/// cheap post-compile sanity check.
pub fn is_valid_wasm(binary: &[u8]) -> bool {
    binary.len() >= 4 && &binary[..4] == b"\0asm"
}

/// Mirrors `wasm_builder.py::is_wasm_suitable`: pick WASM as the target
/// backend for a new build only when no credentials are required and the
/// task reads as pure computation.
pub fn is_wasm_suitable(task_description: &str, required_credentials: &[String]) -> bool {
    if !required_credentials.is_empty() {
        return false;
    }

    let task_lower = task_description.to_lowercase();

    const REQUIRES_CONTAINER: &[&str] = &[
        "api", "http", "fetch", "request", "download", "secret", "key", "credential", "auth", "token", "database",
        "storage", "persist", "save", "file", "docker", "container", "deploy",
    ];
    if REQUIRES_CONTAINER.iter().any(|kw| task_lower.contains(kw)) {
        return false;
    }

    const WASM_SUITABLE: &[&str] = &[
        "calculate", "compute", "math", "fibonacci", "prime", "factorial", "sum", "multiply", "divide", "add",
        "parse", "transform", "format", "convert", "encode", "decode", "sort", "filter", "process", "analyze",
    ];
    WASM_SUITABLE.iter().any(|kw| task_lower.contains(kw))
}

pub fn default_wasm_root() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| Path::new(".").to_path_buf()).join(".helix").join("wasm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manifest(name: &str, task: &str) -> WasmManifest {
        WasmManifest {
            name: name.to_string(),
            task: task.to_string(),
            runtime: "wasm".to_string(),
            capabilities: vec!["compute".to_string()],
            created: "2026-01-01T00:00:00Z".to_string(),
            wasm_file: DEFAULT_WASM_FILE.to_string(),
            embedding: None,
        }
    }

    #[test]
    fn store_then_list_round_trips() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        registry.store("helix-compute-1", b"\0asmdata", &manifest("helix-compute-1", "compute a fibonacci number")).unwrap();
        assert_eq!(registry.list_agents(), vec!["helix-compute-1".to_string()]);
    }

    #[test]
    fn get_wasm_binary_is_byte_for_byte() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        let binary = b"\0asm\x01\x02\x03".to_vec();
        registry.store("a", &binary, &manifest("a", "sort numbers")).unwrap();
        assert_eq!(registry.get_wasm_binary("a").unwrap().unwrap(), binary);
    }

    #[test]
    fn partial_write_is_never_listed() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("partial")).unwrap();
        fs::write(dir.path().join("partial").join("manifest.json"), "{}").unwrap();
        assert!(registry.list_agents().is_empty());
    }

    #[test]
    fn search_finds_matching_agent_above_threshold() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        registry
            .store("helix-compute-1", b"\0asm", &manifest("helix-compute-1", "calculate exact mathematical computations"))
            .unwrap();
        let (name, score) = registry.search("calculate mathematical computation").unwrap();
        assert_eq!(name, "helix-compute-1");
        assert!(score >= MATCH_THRESHOLD);
    }

    #[test]
    fn search_below_threshold_returns_none() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        registry.store("helix-research-1", b"\0asm", &manifest("helix-research-1", "research the history of rome")).unwrap();
        assert!(registry.search("bake a chocolate cake").is_none());
    }

    #[test]
    fn semantic_search_forces_keyword_only_without_embedding() {
        let dir = tempdir().unwrap();
        let registry = WasmRegistry::new(dir.path()).unwrap();
        registry.store("helix-compute-1", b"\0asm", &manifest("helix-compute-1", "calculate a fibonacci number")).unwrap();
        let keyword_only = registry.search("calculate a fibonacci number").unwrap();
        let hybrid = registry.semantic_search("calculate a fibonacci number", None, 0.5).unwrap();
        assert!((keyword_only.1 - hybrid.1).abs() < 1e-6);
    }

    #[test]
    fn valid_wasm_magic_bytes() {
        assert!(is_valid_wasm(b"\0asm\x01\x00\x00\x00"));
        assert!(!is_valid_wasm(b"not wasm"));
        assert!(!is_valid_wasm(b"\0a"));
    }

    #[test]
    fn wasm_suitable_for_pure_compute() {
        assert!(is_wasm_suitable("calculate the 10th fibonacci number", &[]));
        assert!(!is_wasm_suitable("fetch data from an api", &[]));
        assert!(!is_wasm_suitable("calculate a fibonacci number", &["web-search key".to_string()]));
        assert!(!is_wasm_suitable("write a poem about rain", &[]));
    }
}
