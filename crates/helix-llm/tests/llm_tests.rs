//! Tests for helix-llm: provider trait, mock provider, and model router.

use helix_llm::*;
use std::sync::Arc;
use std::time::Duration;

// ===========================================================================
// MockProvider
// ===========================================================================

#[tokio::test]
async fn mock_provider_name_and_models() {
    let provider = MockProvider::new();
    assert_eq!(provider.name(), "mock");
    assert!(provider.models().contains(&"mock-1"));
}

#[tokio::test]
async fn mock_provider_supports_model() {
    let provider = MockProvider::new();
    assert!(provider.supports_model("mock-1"));
    assert!(!provider.supports_model("gpt-4"));
}

#[tokio::test]
async fn mock_provider_completes_without_network() {
    let provider = MockProvider::new();
    let out = provider
        .complete("sort a list of numbers", "mock-1", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!out.is_empty());
}

// ===========================================================================
// LlmError
// ===========================================================================

#[test]
fn rate_limited_is_retryable() {
    let e = LlmError::RateLimited { retry_after_ms: 1000 };
    assert!(e.is_retryable());
}

#[test]
fn model_not_found_is_retryable() {
    let e = LlmError::ModelNotFound("gpt-5".into());
    assert!(e.is_retryable());
}

#[test]
fn request_failed_is_not_retryable() {
    let e = LlmError::RequestFailed("boom".into());
    assert!(!e.is_retryable());
}

#[test]
fn error_messages_render() {
    let errors = vec![
        LlmError::RequestFailed("x".into()),
        LlmError::AuthFailed("x".into()),
        LlmError::RateLimited { retry_after_ms: 500 },
        LlmError::ModelNotFound("x".into()),
        LlmError::InvalidResponse("x".into()),
        LlmError::Timeout(Duration::from_secs(5)),
    ];
    for e in errors {
        let _ = format!("{}", e);
    }
}

// ===========================================================================
// ModelRouter
// ===========================================================================

#[tokio::test]
async fn router_picks_first_matching_model_in_preference_order() {
    let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new());
    let router = ModelRouter::from_preference_list(provider, "gpt-4, mock-1");
    let out = router.complete("process some data", Duration::from_secs(1)).await;
    assert!(out.is_ok());
}

#[tokio::test]
async fn router_with_no_supported_models_errors() {
    let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new());
    let router = ModelRouter::from_preference_list(provider, "gpt-4, gpt-3.5");
    let out = router.complete("process some data", Duration::from_secs(1)).await;
    assert!(out.is_err());
}

#[tokio::test]
async fn router_ignores_blank_entries_in_preference_list() {
    let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new());
    let router = ModelRouter::from_preference_list(provider, " , mock-1, ");
    let out = router.complete("hello", Duration::from_secs(1)).await;
    assert!(out.is_ok());
}
