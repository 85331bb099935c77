//! The build pipeline state machine: Refine → Classify → Generate →
//! Compile (retry) → Package → Verify (retry) → Done | Failed. Grounded
//! on `original_source/builder/controller.py::SubAgentController` and
//! spec.md §4.2.

use crate::classify::{classify, Classification};
use crate::compile::CompileSandbox;
use crate::error::{BuilderError, BuilderResult};
use crate::generate::generate;
use crate::package::{agent_name, Packager};
use crate::refine::refine;
use crate::verify::{outcome_to_result, VerifyOutcome, Verifier};
use chrono::Utc;
use helix_core::{AgentClass, RuntimeBackend};
use helix_llm::ModelRouter;
use helix_memory::MemoryManager;
use helix_registry::{is_wasm_suitable, AgentLabels, WasmManifest, WasmRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Max repairs per retry loop; total attempts = this + 1, per spec.md
/// §4.2 "Max retries per loop = 2 (i.e., 3 attempts)".
const MAX_RETRIES: u32 = 2;
const VERIFY_BACKOFF: Duration = Duration::from_secs(1);
const REPAIR_TIMEOUT: Duration = Duration::from_secs(300);

pub struct BuildOutcome {
    pub reference: String,
    pub runtime: RuntimeBackend,
    pub class: AgentClass,
    pub refined_task: String,
    pub required_credentials: Vec<String>,
    pub source: String,
    pub attempts: u32,
}

pub struct BuildPipeline {
    router: Arc<ModelRouter>,
    memory: Option<Arc<MemoryManager>>,
    compile_sandbox: Arc<dyn CompileSandbox>,
    wasm_sandbox: Option<Arc<dyn CompileSandbox>>,
    packager: Arc<dyn Packager>,
    verifier: Arc<dyn Verifier>,
    wasm_registry: Option<Arc<WasmRegistry>>,
    author: String,
}

impl BuildPipeline {
    pub fn new(
        router: Arc<ModelRouter>,
        compile_sandbox: Arc<dyn CompileSandbox>,
        packager: Arc<dyn Packager>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            router,
            memory: None,
            compile_sandbox,
            wasm_sandbox: None,
            packager,
            verifier,
            wasm_registry: None,
            author: "helix".to_string(),
        }
    }

    pub fn with_memory(mut self, memory: Arc<MemoryManager>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_wasm_backend(mut self, sandbox: Arc<dyn CompileSandbox>, registry: Arc<WasmRegistry>) -> Self {
        self.wasm_sandbox = Some(sandbox);
        self.wasm_registry = Some(registry);
        self
    }

    /// Runs the full pipeline for one raw task, returning a reference to
    /// the verified, registered agent.
    pub async fn create(&self, raw_task: &str) -> BuilderResult<BuildOutcome> {
        let refined_task = refine(&self.router, raw_task).await;
        info!(raw = raw_task, refined = %refined_task, "refine stage complete");

        let classification = classify(&refined_task);
        info!(class = %classification.class, reason = %classification.reason, "classify stage complete");

        let memory_context = match &self.memory {
            Some(m) => m.format_context_for_prompt(&refined_task, Some(classification.class.as_str())).unwrap_or_default(),
            None => String::new(),
        };

        let source = generate(&self.router, &refined_task, &classification, &memory_context).await?;
        info!(bytes = source.len(), "generate stage complete");

        let use_wasm = self.wasm_registry.is_some()
            && self.wasm_sandbox.is_some()
            && is_wasm_suitable(&refined_task, &classification.required_credentials);

        if use_wasm {
            self.build_wasm(refined_task, classification, source).await
        } else {
            self.build_container(refined_task, classification, source).await
        }
    }

    async fn build_container(&self, refined_task: String, classification: Classification, source: String) -> BuilderResult<BuildOutcome> {
        let (binary, attempts) = self.compile_with_repair(source.clone(), self.compile_sandbox.as_ref()).await?;
        info!(attempts, "compile stage complete");

        let name = agent_name(classification.class, Utc::now().timestamp());
        let labels = AgentLabels {
            task: refined_task.clone(),
            capabilities: classification.class.as_str().to_string(),
            agent_type: classification.class.as_str().to_string(),
            created: Utc::now().to_rfc3339(),
            author: self.author.clone(),
        };

        let reference = self.package_and_verify_with_retry(&binary, &name, &labels).await?;
        info!(reference = %reference, "package+verify stage complete");

        Ok(BuildOutcome {
            reference,
            runtime: RuntimeBackend::Container,
            class: classification.class,
            refined_task,
            required_credentials: classification.required_credentials,
            source,
            attempts,
        })
    }

    async fn build_wasm(&self, refined_task: String, classification: Classification, source: String) -> BuilderResult<BuildOutcome> {
        let sandbox = self.wasm_sandbox.as_ref().expect("checked by caller");
        let registry = self.wasm_registry.as_ref().expect("checked by caller");

        let (binary, attempts) = self.compile_with_repair(source.clone(), sandbox.as_ref()).await?;
        info!(attempts, "wasm compile stage complete");

        let name = agent_name(classification.class, Utc::now().timestamp());
        let manifest = WasmManifest {
            name: name.clone(),
            task: refined_task.clone(),
            runtime: "wasm".to_string(),
            capabilities: vec![classification.class.as_str().to_string()],
            created: Utc::now().to_rfc3339(),
            wasm_file: "agent.wasm".to_string(),
            embedding: None,
        };
        let path = registry.store(&name, &binary, &manifest)?;
        info!(reference = %path.display(), "wasm registration complete");

        Ok(BuildOutcome {
            reference: path.display().to_string(),
            runtime: RuntimeBackend::Wasm,
            class: classification.class,
            refined_task,
            required_credentials: classification.required_credentials,
            source,
            attempts,
        })
    }

    /// Compile retry loop: on failure, feeds `{source, error}` back into
    /// the LLM with a "fix this" prompt and recompiles, up to
    /// `MAX_RETRIES` repairs.
    async fn compile_with_repair(&self, mut source: String, sandbox: &dyn CompileSandbox) -> BuilderResult<(Vec<u8>, u32)> {
        let mut last_err: Option<BuilderError> = None;

        for attempt in 0..=MAX_RETRIES {
            match sandbox.compile(&source).await {
                Ok(binary) => return Ok((binary, attempt + 1)),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "compile attempt failed");
                    let error_text = e.to_string();
                    last_err = Some(e);

                    if attempt == MAX_RETRIES {
                        break;
                    }

                    let repair_prompt = format!(
                        "The following Go program failed to compile with this error:\n\n{}\n\n\
                         Source:\n{}\n\n\
                         Fix the program. Output ONLY the corrected raw Go code, no markdown, no explanation.",
                        error_text, source
                    );
                    source = match self.router.complete(&repair_prompt, REPAIR_TIMEOUT).await {
                        Ok(fixed) => strip_code_fence(&fixed),
                        Err(llm_err) => return Err(BuilderError::from(llm_err)),
                    };
                }
            }
        }

        Err(BuilderError::pipeline_exhausted("compile", last_err.map(|e| e.to_string()).unwrap_or_default()))
    }

    /// Package+verify retry loop: on verify failure, backs off ≥1s and
    /// retries the same binary up to `MAX_RETRIES` more times.
    async fn package_and_verify_with_retry(&self, binary: &[u8], name: &str, labels: &AgentLabels) -> BuilderResult<String> {
        let mut last_err: Option<BuilderError> = None;

        for attempt in 0..=MAX_RETRIES {
            let reference = match self.packager.package(binary, name, labels).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "package attempt failed");
                    last_err = Some(e);
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(VERIFY_BACKOFF).await;
                    }
                    continue;
                }
            };

            match self.verifier.verify(&reference).await {
                Ok(outcome) => match outcome_to_result(outcome, &reference) {
                    Ok(()) => return Ok(reference),
                    Err(e) => {
                        warn!(attempt = attempt + 1, error = %e, "verify attempt failed");
                        last_err = Some(e);
                    }
                },
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "verify call failed");
                    last_err = Some(e);
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(VERIFY_BACKOFF).await;
            }
        }

        Err(BuilderError::pipeline_exhausted("verify", last_err.map(|e| e.to_string()).unwrap_or_default()))
    }
}

fn strip_code_fence(text: &str) -> String {
    text.replace("```go", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Packager;
    use crate::verify::VerifyOutcome;
    use async_trait::async_trait;
    use helix_llm::MockProvider;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct CountingFailThenPassSandbox {
        fail_times: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CompileSandbox for CountingFailThenPassSandbox {
        async fn compile(&self, _source: &str) -> BuilderResult<Vec<u8>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(BuilderError::CompileFailed(format!("syntax error on attempt {}", n + 1)))
            } else {
                Ok(b"binary".to_vec())
            }
        }
    }

    struct AlwaysFailSandbox;

    #[async_trait]
    impl CompileSandbox for AlwaysFailSandbox {
        async fn compile(&self, _source: &str) -> BuilderResult<Vec<u8>> {
            Err(BuilderError::CompileFailed("nope".to_string()))
        }
    }

    struct FakePackager;

    #[async_trait]
    impl Packager for FakePackager {
        async fn package(&self, _binary: &[u8], name: &str, _labels: &AgentLabels) -> BuilderResult<String> {
            Ok(format!("registry.local/{}:latest", name))
        }
    }

    struct FixedVerifier {
        outcome: VerifyOutcome,
    }

    #[async_trait]
    impl Verifier for FixedVerifier {
        async fn verify(&self, _image_ref: &str) -> BuilderResult<VerifyOutcome> {
            Ok(self.outcome)
        }
    }

    struct AlwaysSegfaultVerifier {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Verifier for AlwaysSegfaultVerifier {
        async fn verify(&self, _image_ref: &str) -> BuilderResult<VerifyOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(VerifyOutcome::Segfault)
        }
    }

    fn router() -> Arc<ModelRouter> {
        let provider: Arc<dyn helix_llm::LlmProvider> = Arc::new(MockProvider::new());
        Arc::new(ModelRouter::from_preference_list(provider, "mock-1"))
    }

    #[tokio::test]
    async fn self_heals_on_one_compile_failure() {
        let sandbox: Arc<dyn CompileSandbox> = Arc::new(CountingFailThenPassSandbox { fail_times: 1, calls: AtomicU32::new(0) });
        let pipeline = BuildPipeline::new(
            router(),
            sandbox,
            Arc::new(FakePackager),
            Arc::new(FixedVerifier { outcome: VerifyOutcome::Passed }),
        );

        let outcome = pipeline.create("calculate a fibonacci number").await.unwrap();
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.runtime, RuntimeBackend::Container);
    }

    #[tokio::test]
    async fn compile_exhausts_after_three_attempts() {
        let sandbox: Arc<dyn CompileSandbox> = Arc::new(AlwaysFailSandbox);
        let pipeline = BuildPipeline::new(
            router(),
            sandbox,
            Arc::new(FakePackager),
            Arc::new(FixedVerifier { outcome: VerifyOutcome::Passed }),
        );

        let err = pipeline.create("research quantum computing").await.unwrap_err();
        assert!(matches!(err, BuilderError::PipelineExhausted { stage, .. } if stage == "compile"));
    }

    #[tokio::test]
    async fn verify_segfault_exhausts_after_three_attempts_and_is_terminal() {
        let sandbox: Arc<dyn CompileSandbox> = Arc::new(CountingFailThenPassSandbox { fail_times: 0, calls: AtomicU32::new(0) });
        let verifier = Arc::new(AlwaysSegfaultVerifier { calls: AtomicU32::new(0) });
        let pipeline = BuildPipeline::new(router(), sandbox, Arc::new(FakePackager), verifier.clone());

        let err = pipeline.create("write a poem about rain").await.unwrap_err();
        assert!(matches!(err, BuilderError::PipelineExhausted { stage, .. } if stage == "verify"));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wasm_suitable_task_builds_via_wasm_backend() {
        let dir = tempdir().unwrap();
        let wasm_registry = Arc::new(WasmRegistry::new(dir.path()).unwrap());
        let wasm_sandbox: Arc<dyn CompileSandbox> = Arc::new(CountingFailThenPassSandbox { fail_times: 0, calls: AtomicU32::new(0) });

        let pipeline = BuildPipeline::new(
            router(),
            Arc::new(AlwaysFailSandbox),
            Arc::new(FakePackager),
            Arc::new(FixedVerifier { outcome: VerifyOutcome::Passed }),
        )
        .with_wasm_backend(wasm_sandbox, wasm_registry.clone());

        let outcome = pipeline.create("calculate the 10th fibonacci number").await.unwrap();
        assert_eq!(outcome.runtime, RuntimeBackend::Wasm);
        assert!(!wasm_registry.list_agents().is_empty());
    }
}
