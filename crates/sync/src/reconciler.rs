//! The Reconciler: one consistent view of the recipe collection over the
//! Local Store and the Remote Source.
//!
//! Read path: activating a view publishes the cached snapshot immediately,
//! then subscribes; every remote push is published first and persisted
//! (`replace_all`) in the background. Remote is authoritative, so each push
//! repairs any local divergence.
//!
//! Write path: every create/update/delete is logged in the unsynced ledger,
//! applied to the Local Store, then sent to the Remote Source. A remote
//! failure is returned to the caller and the ledger entry stays until a
//! retry lands it. The local copy only lasts until the next remote snapshot
//! overwrites it; the ledger keeps the full write for `unsynced()` and
//! replays.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};

use recipeshare_core::{Recipe, RecipeDraft, RecipeId, UserId, now_millis};
use recipeshare_infra::{InMemoryUnsyncedLedger, LocalStore, PendingOp, PendingWrite, UnsyncedLedger};
use recipeshare_remote::{
    ImageUpload, ObjectStore, RECIPE_IMAGES, RemoteError, RemoteSource, SessionProvider, SnapshotCallback,
};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::view::{PersistSlot, SnapshotOrigin, ViewHandle, ViewScope, ViewShared, ViewUpdate};

/// Result of replaying the unsynced ledger.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    pub attempted: usize,
    pub synced: usize,
    /// Writes the remote rejected again (still pending).
    pub failed: Vec<SyncError>,
}

impl RetryOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Cheap to clone; clones share collaborators and view numbering.
#[derive(Clone)]
pub struct Reconciler {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSource>,
    ledger: Arc<dyn UnsyncedLedger>,
    session: Arc<dyn SessionProvider>,
    objects: Option<Arc<dyn ObjectStore>>,
    config: SyncConfig,
    next_view: Arc<AtomicU64>,
}

impl Reconciler {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteSource>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            local,
            remote,
            ledger: Arc::new(InMemoryUnsyncedLedger::new()),
            session,
            objects: None,
            config: SyncConfig::default(),
            next_view: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Use a durable ledger instead of the default in-memory one.
    pub fn with_ledger(mut self, ledger: Arc<dyn UnsyncedLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_object_store(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.session.current_user_id()
    }

    // ---------------------------------------------------------------------
    // Read path
    // ---------------------------------------------------------------------

    /// Activate a view: publish the cached snapshot, then go live.
    ///
    /// The first update is always `Snapshot { origin: Local, .. }` (possibly
    /// empty). If the subscription cannot be opened the second is
    /// `RemoteUnavailable` and the view stays `Loading`.
    pub async fn activate(&self, scope: ViewScope) -> ViewHandle {
        let id = self.next_view.fetch_add(1, Ordering::SeqCst);
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (persist_tx, persist_rx) = watch::channel::<PersistSlot>(None);
        let (applied_tx, applied_rx) = watch::channel(0u64);

        let shared = Arc::new(ViewShared::new(id, scope.clone(), updates_tx, persist_tx));

        let cached = match &scope {
            ViewScope::Feed => self.local.get_all().await,
            ViewScope::Owner(user) => self.local.get_by_owner(user).await,
        };
        tracing::debug!(view = id, cached = cached.len(), "publishing cached snapshot");
        shared.publish(ViewUpdate::Snapshot {
            origin: SnapshotOrigin::Local,
            recipes: cached,
        });

        let persist_task = tokio::spawn(persist_snapshots(
            id,
            self.local.clone(),
            persist_rx,
            applied_tx,
        ));

        let callback: SnapshotCallback = {
            let shared = shared.clone();
            Arc::new(move |recipes: Vec<Recipe>| shared.on_remote_snapshot(recipes))
        };

        match self.remote.subscribe(callback).await {
            Ok(subscription) => {
                tracing::info!(view = id, scope = ?scope, "view activated");
                shared.attach(subscription);
            }
            Err(err) => {
                tracing::warn!(view = id, "subscription failed, serving cache only: {err}");
                shared.publish(ViewUpdate::RemoteUnavailable(err.to_string()));
            }
        }

        ViewHandle::new(shared, updates_rx, applied_rx, persist_task)
    }

    /// The signed-in user's recipes.
    pub async fn activate_mine(&self) -> Result<ViewHandle, SyncError> {
        let user = self.current_user().ok_or(SyncError::NotAuthenticated)?;
        Ok(self.activate(ViewScope::Owner(user)).await)
    }

    /// Cached copy of one recipe (edit screen pre-fill).
    pub async fn get(&self, id: &RecipeId) -> Option<Recipe> {
        self.local.get_by_id(id).await
    }

    /// One-shot reconciliation pass: fetch the full collection and make the
    /// Local Store match it. On `RemoteUnavailable` the cache is untouched.
    pub async fn refresh(&self) -> Result<Vec<Recipe>, SyncError> {
        let snapshot = self.remote.fetch_all().await.map_err(|err| {
            tracing::warn!("refresh failed: {err}");
            SyncError::from(err)
        })?;

        self.local.replace_all(snapshot.clone()).await?;

        tracing::info!(recipes = snapshot.len(), "cache refreshed");
        Ok(snapshot)
    }

    // ---------------------------------------------------------------------
    // Write path
    // ---------------------------------------------------------------------

    /// Create a recipe owned by the signed-in user (anonymous if nobody is).
    pub async fn create(&self, draft: RecipeDraft) -> Result<Recipe, SyncError> {
        draft.validate()?;
        let id = self.remote.reserve_id();
        let recipe = draft.into_recipe(id, self.current_user(), now_millis())?;

        self.apply(PendingWrite::create(recipe.clone())).await?;
        Ok(recipe)
    }

    /// Upload `image` (if any) and create the recipe with its URL. An upload
    /// failure aborts before anything is written.
    pub async fn create_with_image(
        &self,
        mut draft: RecipeDraft,
        image: Option<ImageUpload>,
    ) -> Result<Recipe, SyncError> {
        draft.validate()?;
        if let Some(image) = image {
            draft.image_url = Some(self.upload(image).await?);
        }
        self.create(draft).await
    }

    /// Rewrite a recipe's editable fields. Identity, owner and `created_at`
    /// are kept; a draft without an image URL keeps the current image.
    pub async fn update(&self, id: &RecipeId, mut draft: RecipeDraft) -> Result<Recipe, SyncError> {
        draft.validate()?;
        let current = self.lookup(id).await?;
        if draft.image_url.is_none() {
            draft.image_url = current.image_url.clone();
        }
        let recipe = current.with_edits(draft)?;

        self.apply(PendingWrite::update(recipe.clone())).await?;
        Ok(recipe)
    }

    pub async fn update_with_image(
        &self,
        id: &RecipeId,
        mut draft: RecipeDraft,
        image: Option<ImageUpload>,
    ) -> Result<Recipe, SyncError> {
        draft.validate()?;
        if let Some(image) = image {
            draft.image_url = Some(self.upload(image).await?);
        }
        self.update(id, draft).await
    }

    pub async fn delete(&self, id: &RecipeId) -> Result<(), SyncError> {
        self.apply(PendingWrite::delete(id.clone())).await
    }

    /// Writes the remote has not accepted yet, oldest first.
    pub async fn unsynced(&self) -> Result<Vec<PendingWrite>, SyncError> {
        Ok(self.ledger.list().await?)
    }

    /// Replay every pending write against the remote.
    pub async fn retry_unsynced(&self) -> Result<RetryOutcome, SyncError> {
        self.retry_where(|_| true).await
    }

    /// Replay pending writes accepted by `eligible`.
    pub(crate) async fn retry_where(
        &self,
        eligible: impl Fn(&PendingWrite) -> bool,
    ) -> Result<RetryOutcome, SyncError> {
        let pending = self.ledger.list().await?;
        let mut outcome = RetryOutcome::default();

        for write in pending.into_iter().filter(|w| eligible(w)) {
            outcome.attempted += 1;
            match self.push(&write).await {
                Ok(()) => {
                    self.ledger.resolve(write.id).await?;
                    outcome.synced += 1;
                    tracing::info!(recipe = %write.recipe_id, op = write.op.as_str(), "pending write synced");
                }
                Err(err) => {
                    self.ledger
                        .mark_attempt_failed(write.id, err.to_string())
                        .await?;
                    tracing::warn!(
                        recipe = %write.recipe_id,
                        attempts = write.attempts + 1,
                        "pending write still failing: {err}"
                    );
                    outcome
                        .failed
                        .push(SyncError::remote_write(write.recipe_id.as_str(), err));
                }
            }
        }

        Ok(outcome)
    }

    async fn upload(&self, image: ImageUpload) -> Result<String, SyncError> {
        let objects = self
            .objects
            .as_ref()
            .ok_or_else(|| SyncError::UploadFailed("no object store configured".into()))?;
        let url = objects.upload(RECIPE_IMAGES, image).await.map_err(|err| {
            tracing::warn!("image upload failed: {err}");
            SyncError::from(err)
        })?;
        Ok(url)
    }

    /// Current version of a recipe: cache first, then the remote.
    async fn lookup(&self, id: &RecipeId) -> Result<Recipe, SyncError> {
        if let Some(recipe) = self.local.get_by_id(id).await {
            return Ok(recipe);
        }
        let remote = self.remote.fetch_all().await?;
        remote
            .into_iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| SyncError::Invalid(format!("unknown recipe {id}")))
    }

    /// Ledger, then Local Store, then Remote Source.
    async fn apply(&self, write: PendingWrite) -> Result<(), SyncError> {
        if let Err(err) = self.ledger.record(write.clone()).await {
            tracing::error!(recipe = %write.recipe_id, "failed to log pending write: {err}");
        }

        let local_result = match (&write.op, &write.recipe) {
            (PendingOp::Delete, _) => self.local.delete_by_id(&write.recipe_id).await,
            (_, Some(recipe)) => self.local.upsert_many(vec![recipe.clone()]).await,
            (_, None) => Ok(()),
        };
        if let Err(err) = local_result {
            tracing::error!(recipe = %write.recipe_id, "local write failed, continuing with remote: {err}");
        }

        match self.push(&write).await {
            Ok(()) => {
                if let Err(err) = self.ledger.resolve(write.id).await {
                    tracing::error!(recipe = %write.recipe_id, "failed to clear pending write: {err}");
                }
                tracing::info!(recipe = %write.recipe_id, op = write.op.as_str(), "write synced");
                Ok(())
            }
            Err(err) => {
                if let Err(ledger_err) = self
                    .ledger
                    .mark_attempt_failed(write.id, err.to_string())
                    .await
                {
                    tracing::error!(recipe = %write.recipe_id, "failed to update pending write: {ledger_err}");
                }
                tracing::warn!(
                    recipe = %write.recipe_id,
                    op = write.op.as_str(),
                    "remote write failed, kept as unsynced: {err}"
                );
                Err(SyncError::remote_write(write.recipe_id.as_str(), err))
            }
        }
    }

    async fn push(&self, write: &PendingWrite) -> Result<(), RemoteError> {
        let remote = &self.remote;
        match (write.op, &write.recipe) {
            (PendingOp::Create, Some(recipe)) => remote.create(recipe.clone()).await.map(|_| ()),
            (PendingOp::Update, Some(recipe)) => remote.update(recipe.clone()).await,
            (PendingOp::Delete, _) => remote.delete(&write.recipe_id).await,
            (_, None) => Err(RemoteError::write_failed("pending write has no recipe")),
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("has_object_store", &self.objects.is_some())
            .finish()
    }
}

/// Per-view persistence: writes each remote snapshot to the Local Store in
/// push order, coalescing to the latest when it falls behind. Exits once the
/// view is torn down and the last snapshot is written.
async fn persist_snapshots(
    view: u64,
    local: Arc<dyn LocalStore>,
    mut snapshots: watch::Receiver<PersistSlot>,
    applied: watch::Sender<u64>,
) {
    while snapshots.changed().await.is_ok() {
        let Some((seq, recipes)) = snapshots.borrow_and_update().clone() else {
            continue;
        };

        match local.replace_all(recipes).await {
            Ok(()) => tracing::debug!(view, seq, "remote snapshot persisted"),
            Err(err) => tracing::error!(view, seq, "failed to persist remote snapshot: {err}"),
        }
        applied.send_replace(seq);
    }
}
