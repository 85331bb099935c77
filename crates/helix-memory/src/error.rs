//! Error type for the memory store.

use thiserror::Error;

pub type MemoryResult<T> = Result<T, MemoryError>;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<MemoryError> for helix_core::Error {
    fn from(e: MemoryError) -> Self {
        helix_core::Error::MemoryUnavailable(e.to_string())
    }
}
