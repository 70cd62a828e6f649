//! `recipeshare-sync`
//!
//! **Responsibility:** keep the device cache and the remote collection
//! eventually consistent, and give screens one consistent view of it.
//!
//! - `Reconciler`: view activation (local-first, remote-authoritative), the
//!   dual-write path, unsynced-write retry
//! - `ViewHandle`: per-screen update stream and lifecycle
//! - `RetryWorker`: optional background retry with backoff
//! - `ProfileService`: user profile load/edit

pub mod config;
pub mod error;
pub mod profile;
pub mod reconciler;
pub mod retry;
pub mod view;

pub use config::SyncConfig;
pub use error::SyncError;
pub use profile::ProfileService;
pub use reconciler::{Reconciler, RetryOutcome};
pub use retry::RetryWorker;
pub use view::{SnapshotOrigin, ViewHandle, ViewScope, ViewState, ViewUpdate};
