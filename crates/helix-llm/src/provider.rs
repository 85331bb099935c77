//! LLM provider trait: a single non-streaming completion call.

use std::time::Duration;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl LlmError {
    /// Whether a router should try the next model/provider in its
    /// preference list rather than surface this error to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::ModelNotFound(_) | LlmError::AuthFailed(_)
        )
    }
}

/// A provider of text completions. Deliberately narrow: one prompt in,
/// one string out, bounded by a caller-supplied timeout. Wire format and
/// streaming are an implementation detail of each provider.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn models(&self) -> Vec<&str>;

    fn supports_model(&self, model: &str) -> bool {
        self.models()
            .iter()
            .any(|m| *m == model || model.starts_with(m))
    }

    async fn complete(&self, prompt: &str, model: &str, timeout: Duration) -> LlmResult<String>;
}
