//! Error type for the build pipeline.

use thiserror::Error;

pub type BuilderResult<T> = Result<T, BuilderError>;

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("llm error: {0}")]
    Llm(#[from] helix_llm::LlmError),

    #[error("compile failed: {0}")]
    CompileFailed(String),

    #[error("package failed: {0}")]
    PackageFailed(String),

    #[error("verify failed: {0}")]
    VerifyFailed(String),

    #[error("registry error: {0}")]
    Registry(#[from] helix_registry::RegistryError),

    #[error("memory error: {0}")]
    Memory(#[from] helix_memory::MemoryError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline exhausted retries at stage {stage}: {message}")]
    PipelineExhausted { stage: String, message: String },
}

impl BuilderError {
    pub fn pipeline_exhausted(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PipelineExhausted { stage: stage.into(), message: message.into() }
    }
}

impl From<BuilderError> for helix_core::Error {
    fn from(e: BuilderError) -> Self {
        match e {
            BuilderError::CompileFailed(m) => helix_core::Error::CompileFailed(m),
            BuilderError::PackageFailed(m) => helix_core::Error::PackageFailed(m),
            BuilderError::VerifyFailed(m) => helix_core::Error::VerifyFailed(m),
            BuilderError::PipelineExhausted { stage, message } => helix_core::Error::pipeline_exhausted(stage, message),
            other => helix_core::Error::Internal(other.to_string()),
        }
    }
}
