//! Preference-ordered model selection and uniform retry, grounded on the
//! original `select_model` env-var-then-preference-list logic.

use crate::provider::{LlmError, LlmProvider, LlmResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Tries each `(provider, model)` pair in order, moving to the next entry
/// whenever the provider reports a retryable error (auth failure, missing
/// model, rate limit). The first success wins; if every entry fails the
/// last error is returned.
pub struct ModelRouter {
    candidates: Vec<(Arc<dyn LlmProvider>, String)>,
}

impl ModelRouter {
    pub fn new(preferences: Vec<(Arc<dyn LlmProvider>, String)>) -> Self {
        Self { candidates: preferences }
    }

    /// Builds a router from a single provider and a comma-separated model
    /// preference list (the shape of `HELIX_LLM_MODELS`), keeping only
    /// models that provider actually supports, in the given order.
    pub fn from_preference_list(provider: Arc<dyn LlmProvider>, preference_list: &str) -> Self {
        let candidates = preference_list
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .filter(|m| provider.supports_model(m))
            .map(|m| (provider.clone(), m.to_string()))
            .collect();
        Self { candidates }
    }

    pub async fn complete(&self, prompt: &str, timeout: Duration) -> LlmResult<String> {
        let mut last_err: Option<LlmError> = None;
        for (provider, model) in &self.candidates {
            match provider.complete(prompt, model, timeout).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() => {
                    warn!(model = %model, error = %e, "model failed, trying next preference");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| LlmError::RequestFailed("no candidate models configured".to_string())))
    }
}
