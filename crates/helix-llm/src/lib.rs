//! Helix LLM - provider abstraction for single-shot code generation calls

pub mod http;
pub mod mock;
pub mod provider;
pub mod router;

pub use http::HttpProvider;
pub use mock::MockProvider;
pub use provider::{LlmError, LlmProvider, LlmResult};
pub use router::ModelRouter;
