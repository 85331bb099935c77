//! Error type for registry access.

use thiserror::Error;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest parse error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("agent not found: {0}")]
    NotFound(String),
}

impl From<RegistryError> for helix_core::Error {
    fn from(e: RegistryError) -> Self {
        helix_core::Error::Registry(e.to_string())
    }
}
