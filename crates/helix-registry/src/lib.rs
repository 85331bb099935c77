//! Helix Registry - unified catalog over container and WASM agent backends

pub mod container;
pub mod error;
pub mod stem;
pub mod types;
pub mod unified;
pub mod wasm;

pub use container::ContainerRegistry;
pub use error::{RegistryError, RegistryResult};
pub use types::{AgentLabels, AgentMatch};
pub use unified::{cosine_similarity, UnifiedRegistry};
pub use wasm::{default_wasm_root, is_valid_wasm, is_wasm_suitable, WasmManifest, WasmRegistry};
