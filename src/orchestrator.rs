//! Single entry point tying the registry, memory, build pipeline, and
//! executor together. Grounded on
//! `original_source/mvp/mvp_runner.py::handle_complex_task` and spec.md
//! §4.1.

use helix_builder::BuildPipeline;
use helix_core::{AgentClass, ExecutionResult, Outcome, RuntimeBackend};
use helix_executor::{CredentialEnv, Executor};
use helix_memory::MemoryManager;
use helix_registry::UnifiedRegistry;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

/// Where the reference that actually ran came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultSource {
    Memory,
    Registry,
    Built,
}

pub struct RunOutcome {
    pub reference: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub source: ResultSource,
}

pub struct Orchestrator {
    registry: Arc<UnifiedRegistry>,
    memory: Arc<MemoryManager>,
    pipeline: Arc<BuildPipeline>,
    executor: Arc<Executor>,
    build_permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(registry: Arc<UnifiedRegistry>, memory: Arc<MemoryManager>, pipeline: Arc<BuildPipeline>, executor: Arc<Executor>, max_concurrent_builds: usize) -> Self {
        Self {
            registry,
            memory,
            pipeline,
            executor,
            build_permits: Arc::new(Semaphore::new(max_concurrent_builds.max(1))),
        }
    }

    /// Runs one task end to end: locate or build an agent, execute it,
    /// finalize memory. Steps are strictly sequential within a task, per
    /// spec.md §5's ordering guarantee.
    pub async fn run(&self, config: &Config, task_text: &str) -> RunOutcome {
        self.memory.start_task(task_text);

        let memory_hit = self.find_memory_hit(task_text);
        let (reference, backend, class, refined_task, source) = if let Some((reference, backend, class, refined_task)) = memory_hit {
            (reference, backend, class, refined_task, ResultSource::Memory)
        } else if let Some(candidate) = self.registry.search(task_text).await {
            (candidate.reference, candidate.runtime, None, task_text.to_string(), ResultSource::Registry)
        } else {
            match self.build(task_text).await {
                Ok((reference, backend, class, refined_task)) => (reference, backend, Some(class), refined_task, ResultSource::Built),
                Err(e) => {
                    warn!(error = %e, "build pipeline failed, recording failure in memory");
                    let _ = self.memory.complete_task(task_text, task_text, None, None, Vec::new(), Outcome::Failure, 0, None, Some(e.to_string()));
                    return RunOutcome {
                        reference: String::new(),
                        stdout: String::new(),
                        stderr: e.to_string(),
                        exit_code: -1,
                        duration_ms: 0,
                        source: ResultSource::Built,
                    };
                }
            }
        };

        let credentials = self.credentials_for(config);
        let cancel = CancellationToken::new();
        let execution = match self.executor.run_cancellable(backend, &reference, task_text, &credentials, &cancel).await {
            Ok(result) => result,
            Err(e) => ExecutionResult {
                reference: reference.clone(),
                backend,
                stdout: String::new(),
                stderr: e.to_string(),
                exit_code: -1,
                duration_ms: 0,
            },
        };

        self.finalize(task_text, &refined_task, class, &reference, &execution);

        if let Ok(Some(stats)) = self.memory.run_lifecycle() {
            info!(promoted = stats.promoted, demoted = stats.demoted, archived = stats.archived, "lifecycle pass ran opportunistically");
        }

        RunOutcome {
            reference,
            stdout: execution.stdout,
            stderr: execution.stderr,
            exit_code: execution.exit_code,
            duration_ms: execution.duration_ms,
            source,
        }
    }

    /// Checks episodic memory for a still-resolvable success to prefer
    /// over a fresh registry search, per spec.md §4.1 step 3.
    fn find_memory_hit(&self, task_text: &str) -> Option<(String, RuntimeBackend, Option<AgentClass>, String)> {
        let candidates = self.memory.recall(task_text, 1).ok()?;
        let top = candidates.into_iter().next()?;
        if top.outcome != Outcome::Success {
            return None;
        }
        let reference = top.agent_image?;
        let backend = if reference.ends_with(".wasm") { RuntimeBackend::Wasm } else { RuntimeBackend::Container };
        Some((reference, backend, top.agent_type, top.refined_task))
    }

    async fn build(&self, task_text: &str) -> Result<(String, RuntimeBackend, AgentClass, String), helix_builder::BuilderError> {
        let _permit = self.build_permits.acquire().await.expect("build semaphore closed");
        let outcome = self.pipeline.create(task_text).await?;
        Ok((outcome.reference, outcome.runtime, outcome.class, outcome.refined_task))
    }

    fn credentials_for(&self, config: &Config) -> Vec<CredentialEnv> {
        let mut creds = Vec::new();
        if let Some(key) = &config.llm_api_key {
            creds.push((helix_core::env_keys::LLM_API_KEY.to_string(), key.clone()));
        }
        if let Some(key) = &config.web_search_key {
            creds.push((helix_core::env_keys::WEB_SEARCH_KEY.to_string(), key.clone()));
        }
        if let Some(cx) = &config.web_search_cx {
            creds.push((helix_core::env_keys::WEB_SEARCH_CX.to_string(), cx.clone()));
        }
        creds
    }

    fn finalize(&self, raw_task: &str, refined_task: &str, class: Option<AgentClass>, reference: &str, execution: &ExecutionResult) {
        let outcome = execution.outcome();
        let summary = execution.stdout.chars().take(500).collect::<String>();
        let error = if outcome.is_success() { None } else { Some(execution.stderr.clone()) }.filter(|e| !e.is_empty());

        match self.memory.complete_task(
            raw_task,
            refined_task,
            class,
            Some(reference.to_string()),
            Vec::new(),
            outcome,
            execution.duration_ms,
            Some(summary),
            error,
        ) {
            Ok(_) => info!(reference = %reference, outcome = ?outcome, "task finalized in memory"),
            Err(e) => warn!(error = %e, "failed to finalize task in memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use helix_builder::compile::CompileSandbox;
    use helix_builder::package::Packager;
    use helix_builder::verify::{VerifyOutcome, Verifier};
    use helix_llm::{LlmProvider, ModelRouter};
    use helix_memory::MemoryManager;
    use helix_registry::{AgentLabels, ContainerRegistry, WasmRegistry};
    use tempfile::tempdir;

    struct FakeSandbox;

    #[async_trait::async_trait]
    impl CompileSandbox for FakeSandbox {
        async fn compile(&self, _source: &str) -> helix_builder::BuilderResult<Vec<u8>> {
            Ok(b"binary".to_vec())
        }
    }

    struct FakePackager;

    #[async_trait::async_trait]
    impl Packager for FakePackager {
        async fn package(&self, _binary: &[u8], name: &str, _labels: &AgentLabels) -> helix_builder::BuilderResult<String> {
            Ok(format!("registry.local/{}:latest", name))
        }
    }

    struct FakeVerifier;

    #[async_trait::async_trait]
    impl Verifier for FakeVerifier {
        async fn verify(&self, _image_ref: &str) -> helix_builder::BuilderResult<VerifyOutcome> {
            Ok(VerifyOutcome::Passed)
        }
    }

    struct FakeWasmChannel;

    #[async_trait::async_trait]
    impl helix_executor::WasmChannel for FakeWasmChannel {
        async fn request(&self, request: helix_executor::WasmTaskRequest, _timeout: std::time::Duration) -> helix_executor::ExecutorResult<helix_executor::WasmTaskResponse> {
            Ok(helix_executor::WasmTaskResponse {
                output: Some(format!("{{\"echo\":\"{}\"}}", request.input)),
                error: None,
                worker_id: Some("fake".to_string()),
            })
        }

        async fn ping(&self) -> helix_executor::ExecutorResult<u32> {
            Ok(1)
        }
    }

    fn router() -> Arc<ModelRouter> {
        let provider: Arc<dyn LlmProvider> = Arc::new(helix_llm::MockProvider::new());
        Arc::new(ModelRouter::from_preference_list(provider, "mock-1"))
    }

    fn test_config() -> Config {
        Config {
            keychain_service: "helix".to_string(),
            llm_endpoint: String::new(),
            llm_models: "mock-1".to_string(),
            registry_url: "localhost:5000".to_string(),
            wasm_registry_root: std::env::temp_dir(),
            memory_db_path: None,
            memory_buffer_minutes: 5,
            max_concurrent_builds: 4,
            llm_api_key: None,
            web_search_key: None,
            web_search_cx: None,
        }
    }

    #[tokio::test]
    async fn builds_and_executes_a_fresh_task_when_nothing_is_cached() {
        let db_dir = tempdir().unwrap();
        let wasm_dir = tempdir().unwrap();
        let wasm_registry = Arc::new(WasmRegistry::new(wasm_dir.path()).unwrap());

        let memory = Arc::new(MemoryManager::open(Some(db_dir.path().join("memory.db")), "test-session").unwrap());
        let registry = Arc::new(UnifiedRegistry::new(ContainerRegistry::new("http://localhost:1"), WasmRegistry::new(tempdir().unwrap().path()).unwrap()));
        let pipeline = Arc::new(
            BuildPipeline::new(router(), Arc::new(FakeSandbox), Arc::new(FakePackager), Arc::new(FakeVerifier))
                .with_wasm_backend(Arc::new(FakeSandbox), wasm_registry),
        );
        let executor = Arc::new(Executor::new().with_wasm_channel(Box::new(FakeWasmChannel)));

        let orchestrator = Orchestrator::new(registry, memory, pipeline, executor, 4);
        let outcome = orchestrator.run(&test_config(), "calculate the 10th fibonacci number").await;

        assert_eq!(outcome.source, ResultSource::Built);
        assert!(!outcome.reference.is_empty());
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.contains("calculate the 10th fibonacci number"));
    }
}
