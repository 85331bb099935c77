//! Tests for helix-core: domain types and cross-cutting error enum.

use helix_core::*;

// ===========================================================================
// TaskId
// ===========================================================================

#[test]
fn task_id_new_is_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert_ne!(a, b);
}

#[test]
fn task_id_display_matches_uuid() {
    let id = TaskId::new();
    assert_eq!(format!("{}", id), id.as_uuid().to_string());
}

#[test]
fn task_id_serde_roundtrip() {
    let id = TaskId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

// ===========================================================================
// AgentClass
// ===========================================================================

#[test]
fn agent_class_as_str_and_display() {
    assert_eq!(AgentClass::Research.as_str(), "research");
    assert_eq!(format!("{}", AgentClass::Code), "code");
}

#[test]
fn agent_class_serde_snake_case() {
    let json = serde_json::to_string(&AgentClass::Synthesis).unwrap();
    assert_eq!(json, r#""synthesis""#);
}

// ===========================================================================
// Outcome
// ===========================================================================

#[test]
fn outcome_is_success() {
    assert!(Outcome::Success.is_success());
    assert!(!Outcome::Failure.is_success());
    assert!(!Outcome::Partial.is_success());
    assert!(!Outcome::Pending.is_success());
}

#[test]
fn outcome_serde_roundtrip() {
    for outcome in [Outcome::Success, Outcome::Failure, Outcome::Partial, Outcome::Pending] {
        let json = serde_json::to_string(&outcome).unwrap();
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}

// ===========================================================================
// MemoryTier
// ===========================================================================

#[test]
fn memory_tier_display() {
    assert_eq!(MemoryTier::Working.to_string(), "working");
    assert_eq!(MemoryTier::Episodic.to_string(), "episodic");
    assert_eq!(MemoryTier::Semantic.to_string(), "semantic");
    assert_eq!(MemoryTier::Archive.to_string(), "archive");
}

// ===========================================================================
// RuntimeBackend
// ===========================================================================

#[test]
fn runtime_backend_display() {
    assert_eq!(RuntimeBackend::Container.to_string(), "container");
    assert_eq!(RuntimeBackend::Wasm.to_string(), "wasm");
}

#[test]
fn runtime_backend_serde_lowercase() {
    assert_eq!(serde_json::to_string(&RuntimeBackend::Wasm).unwrap(), r#""wasm""#);
}

// ===========================================================================
// ExecutionResult
// ===========================================================================

#[test]
fn execution_result_outcome_success() {
    let r = ExecutionResult {
        reference: "registry/agent-1:latest".into(),
        backend: RuntimeBackend::Container,
        stdout: "ok".into(),
        stderr: String::new(),
        exit_code: 0,
        duration_ms: 12,
    };
    assert_eq!(r.outcome(), Outcome::Success);
}

#[test]
fn execution_result_outcome_failure_on_segfault() {
    let r = ExecutionResult {
        reference: "registry/agent-1:latest".into(),
        backend: RuntimeBackend::Container,
        stdout: String::new(),
        stderr: "signal: segmentation fault".into(),
        exit_code: 139,
        duration_ms: 3,
    };
    assert_eq!(r.outcome(), Outcome::Failure);
}

// ===========================================================================
// env_keys
// ===========================================================================

#[test]
fn env_keys_are_stable() {
    assert_eq!(env_keys::LLM_API_KEY, "LLM_API_KEY");
    assert_eq!(env_keys::WEB_SEARCH_KEY, "WEB_SEARCH_KEY");
    assert_eq!(env_keys::WEB_SEARCH_CX, "WEB_SEARCH_CX");
    assert_eq!(env_keys::MEMORY_KEY, "HELIX_MEMORY_KEY");
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_llm_constructor() {
    let e = Error::llm("anthropic", "rate limited");
    assert!(e.to_string().contains("anthropic"));
    assert!(e.to_string().contains("rate limited"));
    assert!(matches!(e, Error::Llm { .. }));
}

#[test]
fn error_pipeline_exhausted_constructor() {
    let e = Error::pipeline_exhausted("compile", "3 attempts failed");
    assert!(e.to_string().contains("compile"));
    assert!(e.to_string().contains("3 attempts failed"));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: Error = io_err.into();
    assert!(matches!(e, Error::Io(_)));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let e: Error = json_err.into();
    assert!(matches!(e, Error::Json(_)));
}

#[test]
fn error_display_all_variants() {
    let errors: Vec<Error> = vec![
        Error::llm("p", "m"),
        Error::CompileFailed("x".into()),
        Error::VerifyFailed("x".into()),
        Error::PackageFailed("x".into()),
        Error::Registry("x".into()),
        Error::MemoryUnavailable("x".into()),
        Error::Cancelled,
        Error::pipeline_exhausted("stage", "m"),
        Error::Config("x".into()),
        Error::Internal("x".into()),
    ];
    for e in errors {
        let _ = format!("{}", e);
    }
}
