//! Facade dispatching execution to the container or WASM backend.

use crate::container::{ContainerExecutor, CredentialEnv};
use crate::error::{ExecutorError, ExecutorResult};
use crate::wasm::{LocalWasmExecutor, WasmChannel, WasmTaskRequest};
use helix_core::{ExecutionResult, RuntimeBackend};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Default per-execution deadline, per spec.md §5's deadline table
/// ("execute = 300s default").
pub const DEFAULT_EXECUTE_TIMEOUT: Duration = Duration::from_secs(300);
/// WASM executor deadline, per the same table ("WASM executor = 30s").
pub const WASM_EXECUTE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Executor {
    container: ContainerExecutor,
    wasm_channel: Box<dyn WasmChannel>,
}

impl Executor {
    pub fn new() -> Self {
        Self { container: ContainerExecutor::new(), wasm_channel: Box::new(LocalWasmExecutor::new()) }
    }

    pub fn with_wasm_channel(mut self, channel: Box<dyn WasmChannel>) -> Self {
        self.wasm_channel = channel;
        self
    }

    /// Runs `reference` on the given `backend`, returning a uniform
    /// `ExecutionResult` regardless of which runtime actually executed it.
    pub async fn run(&self, backend: RuntimeBackend, reference: &str, task_text: &str, credentials: &[CredentialEnv]) -> ExecutorResult<ExecutionResult> {
        self.run_cancellable(backend, reference, task_text, credentials, &CancellationToken::new()).await
    }

    /// Same as [`Executor::run`], but races execution against `cancel` so a
    /// caller can abort an in-flight task (e.g. on process shutdown) without
    /// waiting out the full deadline.
    pub async fn run_cancellable(
        &self,
        backend: RuntimeBackend,
        reference: &str,
        task_text: &str,
        credentials: &[CredentialEnv],
        cancel: &CancellationToken,
    ) -> ExecutorResult<ExecutionResult> {
        tokio::select! {
            result = self.run_inner(backend, reference, task_text, credentials) => result,
            _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
        }
    }

    async fn run_inner(&self, backend: RuntimeBackend, reference: &str, task_text: &str, credentials: &[CredentialEnv]) -> ExecutorResult<ExecutionResult> {
        match backend {
            RuntimeBackend::Container => self.container.run(reference, task_text, credentials, DEFAULT_EXECUTE_TIMEOUT).await,
            RuntimeBackend::Wasm => {
                let request = WasmTaskRequest { task_id: Uuid::new_v4().to_string(), wasm_path: reference.to_string(), input: task_text.to_string() };
                let start = std::time::Instant::now();
                let response = self.wasm_channel.request(request, WASM_EXECUTE_TIMEOUT).await?;
                let duration_ms = start.elapsed().as_millis() as u64;

                Ok(ExecutionResult {
                    reference: reference.to_string(),
                    backend: RuntimeBackend::Wasm,
                    stdout: response.output.unwrap_or_default(),
                    stderr: response.error.unwrap_or_default(),
                    exit_code: if response.worker_id.is_some() { 0 } else { -1 },
                    duration_ms,
                })
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
