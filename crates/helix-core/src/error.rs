//! Cross-cutting error type shared by every helix crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("llm error: {provider} - {message}")]
    Llm { provider: String, message: String },

    #[error("compile failed: {0}")]
    CompileFailed(String),

    #[error("verify failed: {0}")]
    VerifyFailed(String),

    #[error("package failed: {0}")]
    PackageFailed(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("memory backend unavailable: {0}")]
    MemoryUnavailable(String),

    #[error("task cancelled")]
    Cancelled,

    #[error("pipeline exhausted retries at stage {stage}: {message}")]
    PipelineExhausted { stage: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn llm(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Llm {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn pipeline_exhausted(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PipelineExhausted {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
