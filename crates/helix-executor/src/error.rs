//! Error type for agent execution.

use thiserror::Error;

pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("container runtime error: {0}")]
    Container(String),

    #[error("wasm runtime error: {0}")]
    Wasm(String),

    #[error("execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("execution cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecutorError> for helix_core::Error {
    fn from(e: ExecutorError) -> Self {
        match e {
            ExecutorError::Cancelled => helix_core::Error::Cancelled,
            other => helix_core::Error::Internal(other.to_string()),
        }
    }
}
