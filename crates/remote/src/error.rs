//! Failures surfaced by the remote collaborators.

use thiserror::Error;

/// Error returned by a `RemoteSource`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Read path: the collection could not be reached (network or auth).
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// Write path: create/update/delete did not complete.
    #[error("remote write failed: {0}")]
    WriteFailed(String),
}

impl RemoteError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }
}

/// Error returned by an `ObjectStore`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Failed(String),
}

impl UploadError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
