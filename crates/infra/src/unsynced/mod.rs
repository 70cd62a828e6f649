//! Unsynced ledger: writes applied locally that the remote collection has
//! not accepted yet.
//!
//! Entries are recorded before the remote write is attempted and resolved
//! once it lands, so a crash or failure in between leaves a record behind.
//! One entry per recipe: a newer write supersedes an older one, since the
//! latest local state is what must reach the remote.

pub mod in_memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use recipeshare_core::{Recipe, RecipeId};

use crate::error::LocalStoreError;

pub use in_memory::InMemoryUnsyncedLedger;
pub use sqlite::SqliteUnsyncedLedger;

/// Kind of remote write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingOp {
    Create,
    Update,
    Delete,
}

impl PendingOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingOp::Create => "Create",
            PendingOp::Update => "Update",
            PendingOp::Delete => "Delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Create" => Some(PendingOp::Create),
            "Update" => Some(PendingOp::Update),
            "Delete" => Some(PendingOp::Delete),
            _ => None,
        }
    }
}

/// A write waiting to be pushed to the remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub id: Uuid,
    pub op: PendingOp,
    pub recipe_id: RecipeId,
    /// Full record for create/update; `None` for delete.
    pub recipe: Option<Recipe>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
}

impl PendingWrite {
    /// A write about to be attempted for the first time.
    pub fn new(op: PendingOp, recipe_id: RecipeId, recipe: Option<Recipe>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            op,
            recipe_id,
            recipe,
            attempts: 0,
            last_error: None,
            recorded_at: now,
            last_attempt_at: now,
        }
    }

    pub fn create(recipe: Recipe) -> Self {
        Self::new(PendingOp::Create, recipe.id.clone(), Some(recipe))
    }

    pub fn update(recipe: Recipe) -> Self {
        Self::new(PendingOp::Update, recipe.id.clone(), Some(recipe))
    }

    pub fn delete(recipe_id: RecipeId) -> Self {
        Self::new(PendingOp::Delete, recipe_id, None)
    }

    /// Failed at least once (as opposed to still in flight).
    pub fn has_failed(&self) -> bool {
        self.attempts > 0
    }
}

#[async_trait]
pub trait UnsyncedLedger: Send + Sync {
    /// Store `write`, replacing any entry for the same recipe.
    async fn record(&self, write: PendingWrite) -> Result<(), LocalStoreError>;

    /// All entries, oldest first.
    async fn list(&self) -> Result<Vec<PendingWrite>, LocalStoreError>;

    /// Bump the attempt counter after a failed push. No-op if `id` was
    /// superseded or resolved meanwhile.
    async fn mark_attempt_failed(&self, id: Uuid, error: String) -> Result<(), LocalStoreError>;

    /// Drop entry `id` once its write has landed. No-op if superseded.
    async fn resolve(&self, id: Uuid) -> Result<(), LocalStoreError>;
}

#[async_trait]
impl<L> UnsyncedLedger for Arc<L>
where
    L: UnsyncedLedger + ?Sized,
{
    async fn record(&self, write: PendingWrite) -> Result<(), LocalStoreError> {
        (**self).record(write).await
    }

    async fn list(&self) -> Result<Vec<PendingWrite>, LocalStoreError> {
        (**self).list().await
    }

    async fn mark_attempt_failed(&self, id: Uuid, error: String) -> Result<(), LocalStoreError> {
        (**self).mark_attempt_failed(id, error).await
    }

    async fn resolve(&self, id: Uuid) -> Result<(), LocalStoreError> {
        (**self).resolve(id).await
    }
}
