//! Remote Source port: the authoritative recipe collection.
//!
//! The remote store is the source of truth for display. Implementations wrap
//! a networked document collection; `InMemoryRemoteSource` stands in for it in
//! tests and the demo binary.
//!
//! ## Delivery Guarantees
//!
//! - Every push carries the **complete** current collection, never a diff.
//! - Pushes to one subscription arrive in the order the source emits them.
//! - After `Subscription::cancel` returns, the callback is not invoked again.
//!
//! ## Write Semantics
//!
//! - `update` is create-or-replace: the document store does not distinguish
//!   the two, so a missing id is written rather than rejected.
//! - `delete` of an absent id succeeds.
//! - The last write to reach the store wins.

use std::sync::Arc;

use async_trait::async_trait;

use recipeshare_core::{Recipe, RecipeId};

use crate::error::RemoteError;
use crate::subscription::Subscription;

/// Callback receiving a full snapshot of the collection.
///
/// Runs on whichever thread the source delivers on. It must return quickly
/// and must not call back into the source.
pub type SnapshotCallback = Arc<dyn Fn(Vec<Recipe>) + Send + Sync>;

#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// One-shot read of the whole collection, newest first.
    async fn fetch_all(&self) -> Result<Vec<Recipe>, RemoteError>;

    /// Register `on_update` for every remote change. The current snapshot is
    /// delivered once immediately after registration.
    async fn subscribe(&self, on_update: SnapshotCallback) -> Result<Subscription, RemoteError>;

    /// Reserve a fresh document id without touching the network.
    fn reserve_id(&self) -> RecipeId;

    /// Write a new document; assigns an id if `recipe.id` is empty.
    async fn create(&self, recipe: Recipe) -> Result<RecipeId, RemoteError>;

    /// Full-document overwrite by id (create-or-replace).
    async fn update(&self, recipe: Recipe) -> Result<(), RemoteError>;

    /// Remove a document; succeeds if it is already gone.
    async fn delete(&self, id: &RecipeId) -> Result<(), RemoteError>;
}

#[async_trait]
impl<S> RemoteSource for Arc<S>
where
    S: RemoteSource + ?Sized,
{
    async fn fetch_all(&self) -> Result<Vec<Recipe>, RemoteError> {
        (**self).fetch_all().await
    }

    async fn subscribe(&self, on_update: SnapshotCallback) -> Result<Subscription, RemoteError> {
        (**self).subscribe(on_update).await
    }

    fn reserve_id(&self) -> RecipeId {
        (**self).reserve_id()
    }

    async fn create(&self, recipe: Recipe) -> Result<RecipeId, RemoteError> {
        (**self).create(recipe).await
    }

    async fn update(&self, recipe: Recipe) -> Result<(), RemoteError> {
        (**self).update(recipe).await
    }

    async fn delete(&self, id: &RecipeId) -> Result<(), RemoteError> {
        (**self).delete(id).await
    }
}
