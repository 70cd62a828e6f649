//! `recipeshare-remote`
//!
//! **Responsibility:** ports to the networked collaborators.
//!
//! This crate provides:
//! - `RemoteSource`: the authoritative recipe collection (fetch, live
//!   subscription, writes)
//! - `ObjectStore`: image upload returning a public URL
//! - `SessionProvider`: who is signed in
//! - `ProfileDirectory`: per-user profile documents
//!
//! Each port ships with an in-memory implementation used by tests and the
//! demo binary.

pub mod document;
pub mod error;
pub mod in_memory;
pub mod object_store;
pub mod profile;
pub mod session;
pub mod source;
pub mod subscription;

pub use document::{Document, FieldValue};
pub use error::{RemoteError, UploadError};
pub use in_memory::InMemoryRemoteSource;
pub use object_store::{
    ImageUpload, InMemoryObjectStore, LocalObjectStore, ObjectStore, PROFILE_IMAGES, RECIPE_IMAGES,
};
pub use profile::{InMemoryProfileDirectory, ProfileDirectory};
pub use session::{InMemorySession, Session, SessionProvider};
pub use source::{RemoteSource, SnapshotCallback};
pub use subscription::Subscription;
