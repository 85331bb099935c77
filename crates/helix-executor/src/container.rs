//! Runs a packaged container-backend agent to completion. Grounded on
//! `original_source/mvp/mvp_runner.py::handle_complex_task`'s `docker run`
//! invocation.

use crate::error::ExecutorResult;
use helix_core::{ExecutionResult, RuntimeBackend};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// A named credential to forward into the container as an environment
/// variable, e.g. `("GEMINI_API_KEY", "...")`.
pub type CredentialEnv = (String, String);

pub struct ContainerExecutor {
    runtime: String,
}

impl ContainerExecutor {
    pub fn new() -> Self {
        Self { runtime: "docker".to_string() }
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Runs `image_ref` with `task_text` as the sole positional argument
    /// and `credentials` forwarded as `-e KEY=VALUE` flags. Captures
    /// stdout/stderr/exit code regardless of exit status - a non-zero
    /// exit is a normal outcome to be recorded, not a `Result::Err`.
    pub async fn run(&self, image_ref: &str, task_text: &str, credentials: &[CredentialEnv], deadline: Duration) -> ExecutorResult<ExecutionResult> {
        let mut args: Vec<String> = vec!["run".to_string(), "--rm".to_string()];
        for (key, value) in credentials {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(image_ref.to_string());
        args.push(task_text.to_string());

        let start = Instant::now();
        let command = Command::new(&self.runtime).args(&args).output();

        let output = match timeout(deadline, command).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(crate::error::ExecutorError::Timeout(deadline));
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        Ok(ExecutionResult {
            reference: image_ref.to_string(),
            backend: RuntimeBackend::Container,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms,
        })
    }
}

impl Default for ContainerExecutor {
    fn default() -> Self {
        Self::new()
    }
}
