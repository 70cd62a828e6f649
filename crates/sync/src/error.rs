//! Reconciler-level error taxonomy.

use thiserror::Error;

use recipeshare_core::DomainError;
use recipeshare_infra::LocalStoreError;
use recipeshare_remote::{RemoteError, UploadError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Read path: the remote collection could not be reached. Recoverable;
    /// cached data stays available.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Write path: the remote did not accept the write for document `id`.
    /// Any local change is kept and recorded as unsynced.
    #[error("remote write failed for {id}: {reason}")]
    RemoteWriteFailed { id: String, reason: String },

    #[error("local store failure: {0}")]
    LocalStoreFailure(String),

    /// Image upload failed; nothing was written.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("no user is signed in")]
    NotAuthenticated,
}

impl SyncError {
    /// Attribute a remote failure to the document being written.
    pub fn remote_write(id: impl Into<String>, err: RemoteError) -> Self {
        let reason = match err {
            RemoteError::Unavailable(msg) | RemoteError::WriteFailed(msg) => msg,
        };
        Self::RemoteWriteFailed {
            id: id.into(),
            reason,
        }
    }

    pub fn is_remote_write_failure(&self) -> bool {
        matches!(self, SyncError::RemoteWriteFailed { .. })
    }
}

impl From<DomainError> for SyncError {
    fn from(err: DomainError) -> Self {
        Self::Invalid(err.to_string())
    }
}

impl From<UploadError> for SyncError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Failed(msg) => Self::UploadFailed(msg),
        }
    }
}

impl From<LocalStoreError> for SyncError {
    fn from(err: LocalStoreError) -> Self {
        match err {
            LocalStoreError::Failure(msg) => Self::LocalStoreFailure(msg),
        }
    }
}

/// Read-path conversion. Write paths use [`SyncError::remote_write`] so the
/// failing document is named.
impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(msg) => Self::RemoteUnavailable(msg),
            RemoteError::WriteFailed(msg) => Self::RemoteWriteFailed {
                id: String::new(),
                reason: msg,
            },
        }
    }
}
