//! Verify stage: a smoke-run of a freshly packaged image with a sentinel
//! argument, catching catastrophic startup failure. Grounded on
//! `original_source/builder/dockerizer.py::Dockerizer.verify_image`.

use crate::error::{BuilderError, BuilderResult};
use tokio::process::Command;

pub const SENTINEL_ARG: &str = "verify_startup";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The process started and exited with a code other than 139/126/127.
    /// Agents are expected to emit a JSON error for unrecognized input, so
    /// any such exit counts as "starts cleanly".
    Passed,
    /// Exit 139: SIGSEGV.
    Segfault,
    /// Exit 126/127: architecture mismatch or exec failure.
    ExecError(i32),
}

impl VerifyOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, VerifyOutcome::Passed)
    }
}

#[async_trait::async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, image_ref: &str) -> BuilderResult<VerifyOutcome>;
}

pub struct DockerVerifier;

#[async_trait::async_trait]
impl Verifier for DockerVerifier {
    async fn verify(&self, image_ref: &str) -> BuilderResult<VerifyOutcome> {
        let output = Command::new("docker").args(["run", "--rm", image_ref, SENTINEL_ARG]).output().await?;

        let code = output.status.code().unwrap_or(-1);
        Ok(classify_exit_code(code))
    }
}

pub fn classify_exit_code(code: i32) -> VerifyOutcome {
    match code {
        139 => VerifyOutcome::Segfault,
        126 | 127 => VerifyOutcome::ExecError(code),
        _ => VerifyOutcome::Passed,
    }
}

pub fn outcome_to_result(outcome: VerifyOutcome, image_ref: &str) -> BuilderResult<()> {
    match outcome {
        VerifyOutcome::Passed => Ok(()),
        VerifyOutcome::Segfault => Err(BuilderError::VerifyFailed(format!("SIGSEGV (139) detected during verification of {}", image_ref))),
        VerifyOutcome::ExecError(code) => Err(BuilderError::VerifyFailed(format!(
            "command execution error ({}) for {} - possibly arch mismatch",
            code, image_ref
        ))),
    }
}
