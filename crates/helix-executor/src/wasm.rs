//! Runs a packaged WASM-backend agent. Grounded on
//! `original_source/builder/wasm_executor.py`: `WASMExecutor` (NATS
//! request/reply to a browser worker pool) and `LocalWASMExecutor`
//! (local `wasmtime` CLI fallback).
//!
//! No pub/sub crate is available, so the NATS path is modeled as a
//! `WasmChannel` trait - any queue/request-reply transport can implement
//! it - with `LocalWasmExecutor` as the one concrete, shippable backend.

use crate::error::{ExecutorError, ExecutorResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WasmTaskRequest {
    pub task_id: String,
    pub wasm_path: String,
    pub input: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WasmTaskResponse {
    pub output: Option<String>,
    pub error: Option<String>,
    pub worker_id: Option<String>,
}

/// A request/reply transport to a pool of WASM worker processes. Mirrors
/// the NATS `request`/`ping` pair from `WASMExecutor`, abstracted so a
/// real pub/sub backend can be dropped in without touching callers.
#[async_trait::async_trait]
pub trait WasmChannel: Send + Sync {
    async fn request(&self, request: WasmTaskRequest, timeout: Duration) -> ExecutorResult<WasmTaskResponse>;

    /// Returns the number of workers currently listening, if the
    /// transport supports discovery.
    async fn ping(&self) -> ExecutorResult<u32>;
}

/// Executes WASM modules locally via the `wasmtime` CLI. Used when no
/// worker pool channel is configured, or as the channel's own fallback
/// when `ping` reports zero workers.
pub struct LocalWasmExecutor {
    binary: String,
}

impl LocalWasmExecutor {
    pub fn new() -> Self {
        Self { binary: "wasmtime".to_string() }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary).arg("--version").output().await.map(|o| o.status.success()).unwrap_or(false)
    }

    pub async fn execute(&self, wasm_path: &str, input_data: &str, deadline: Duration) -> ExecutorResult<WasmTaskResponse> {
        let start = Instant::now();
        let command = Command::new(&self.binary).args([wasm_path, "--", input_data]).output();

        let output = match timeout(deadline, command).await {
            Ok(result) => result?,
            Err(_) => return Err(ExecutorError::Timeout(deadline)),
        };

        let _elapsed = start.elapsed();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let message = if stderr.is_empty() { format!("exit code: {}", output.status.code().unwrap_or(-1)) } else { stderr };
            return Ok(WasmTaskResponse { output: None, error: Some(message), worker_id: Some("local".to_string()) });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(WasmTaskResponse { output: Some(stdout), error: None, worker_id: Some("local".to_string()) })
    }
}

impl Default for LocalWasmExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WasmChannel for LocalWasmExecutor {
    async fn request(&self, request: WasmTaskRequest, timeout: Duration) -> ExecutorResult<WasmTaskResponse> {
        self.execute(&request.wasm_path, &request.input, timeout).await
    }

    /// A local executor is always "one worker" if the binary exists.
    async fn ping(&self) -> ExecutorResult<u32> {
        Ok(if self.is_available().await { 1 } else { 0 })
    }
}
