//! The build pipeline: turns a raw task into a running agent when no
//! existing registry entry fits. Grounded on
//! `original_source/builder/controller.py`.

pub mod classify;
pub mod compile;
pub mod error;
pub mod generate;
pub mod package;
pub mod pipeline;
pub mod refine;
pub mod schemas;
pub mod verify;
pub mod wasm_build;

pub use classify::{classify, Classification};
pub use error::{BuilderError, BuilderResult};
pub use pipeline::{BuildOutcome, BuildPipeline};
