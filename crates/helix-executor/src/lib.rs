//! Runs a registered or freshly built agent to completion, container or
//! WASM backed. Grounded on `original_source/mvp/mvp_runner.py` and
//! `original_source/builder/wasm_executor.py`.

pub mod container;
pub mod error;
pub mod executor;
pub mod wasm;

pub use container::{ContainerExecutor, CredentialEnv};
pub use error::{ExecutorError, ExecutorResult};
pub use executor::{Executor, DEFAULT_EXECUTE_TIMEOUT, WASM_EXECUTE_TIMEOUT};
pub use wasm::{LocalWasmExecutor, WasmChannel, WasmTaskRequest, WasmTaskResponse};
