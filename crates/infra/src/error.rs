//! Device storage failures.

use thiserror::Error;

/// I/O or corruption on the on-device cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocalStoreError {
    #[error("local store failure: {0}")]
    Failure(String),
}

impl LocalStoreError {
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }
}

impl From<anyhow::Error> for LocalStoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failure(format!("{err:#}"))
    }
}
