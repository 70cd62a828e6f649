//! Active views: what one screen is looking at, and the channel its
//! snapshots arrive on.
//!
//! Lifecycle: `Idle -> Loading -> Live -> Idle`. A view enters `Loading` when
//! activated (cached snapshot published), `Live` on the first remote push,
//! and `Idle` on teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use recipeshare_core::{Recipe, UserId, owned_by};
use recipeshare_remote::Subscription;

/// Which slice of the collection a view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// Every recipe (home feed).
    Feed,
    /// Recipes authored by one user ("my recipes"). Filtered client-side
    /// from the full collection.
    Owner(UserId),
}

impl ViewScope {
    pub fn select(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        match self {
            ViewScope::Feed => recipes,
            ViewScope::Owner(user) => owned_by(&recipes, user),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Read from the device cache on activation.
    Local,
    /// Pushed by the remote collection (authoritative).
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// A complete, newest-first snapshot for the view's scope.
    Snapshot {
        origin: SnapshotOrigin,
        recipes: Vec<Recipe>,
    },
    /// The live subscription could not be opened. Cached data (if any) has
    /// already been published; the view stays `Loading`.
    RemoteUnavailable(String),
}

/// Remote snapshot queued for the persistence task, tagged with its push
/// sequence number.
pub(crate) type PersistSlot = Option<(u64, Vec<Recipe>)>;

/// Senders owned by a live view. Taking them out is teardown.
struct Publisher {
    updates: mpsc::UnboundedSender<ViewUpdate>,
    persist: watch::Sender<PersistSlot>,
}

/// State shared between a `ViewHandle` and the subscription callback.
pub(crate) struct ViewShared {
    id: u64,
    scope: ViewScope,
    publisher: Mutex<Option<Publisher>>,
    state: Mutex<ViewState>,
    subscription: Mutex<Option<Subscription>>,
    pushes: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ViewShared {
    pub(crate) fn new(
        id: u64,
        scope: ViewScope,
        updates: mpsc::UnboundedSender<ViewUpdate>,
        persist: watch::Sender<PersistSlot>,
    ) -> Self {
        Self {
            id,
            scope,
            publisher: Mutex::new(Some(Publisher { updates, persist })),
            state: Mutex::new(ViewState::Loading),
            subscription: Mutex::new(None),
            pushes: AtomicU64::new(0),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> ViewState {
        *lock(&self.state)
    }

    /// Publish a non-remote update (cached snapshot, error). Dropped after
    /// teardown.
    pub(crate) fn publish(&self, update: ViewUpdate) {
        let publisher = lock(&self.publisher);
        if let Some(p) = publisher.as_ref() {
            let _ = p.updates.send(update);
        }
    }

    /// Handle one remote push: publish to the view first, then hand the
    /// full snapshot to the persistence task. Both are non-blocking.
    ///
    /// Runs under the publisher lock, so a push racing with teardown is
    /// either fully delivered before teardown or dropped.
    pub(crate) fn on_remote_snapshot(&self, recipes: Vec<Recipe>) {
        let publisher = lock(&self.publisher);
        let Some(p) = publisher.as_ref() else {
            tracing::debug!(view = self.id, "dropping push for torn-down view");
            return;
        };

        *lock(&self.state) = ViewState::Live;
        let _ = p.updates.send(ViewUpdate::Snapshot {
            origin: SnapshotOrigin::Remote,
            recipes: self.scope.select(recipes.clone()),
        });

        let seq = self.pushes.fetch_add(1, Ordering::SeqCst) + 1;
        p.persist.send_replace(Some((seq, recipes)));
    }

    /// Keep `subscription` alive for the view, or cancel it right away if the
    /// view was torn down while subscribing.
    pub(crate) fn attach(&self, subscription: Subscription) {
        let publisher = lock(&self.publisher);
        if publisher.is_none() {
            drop(publisher);
            subscription.cancel();
            return;
        }
        *lock(&self.subscription) = Some(subscription);
    }

    /// Stop publishing and cancel the subscription. Idempotent.
    ///
    /// The senders are taken before cancelling: a callback already in
    /// flight finds no publisher and drops its snapshot.
    pub(crate) fn teardown(&self) {
        let subscription = {
            let mut publisher = lock(&self.publisher);
            if publisher.take().is_none() {
                return;
            }
            *lock(&self.state) = ViewState::Idle;
            lock(&self.subscription).take()
        };
        if let Some(sub) = subscription {
            sub.cancel();
        }
        tracing::debug!(view = self.id, "view deactivated");
    }

    pub(crate) fn pushes(&self) -> u64 {
        self.pushes.load(Ordering::SeqCst)
    }
}

/// A screen's live window onto the collection.
///
/// Updates are consumed with [`ViewHandle::next`] on the caller's own task.
/// Dropping the handle tears the view down.
///
/// The update queue is unbounded and holds every remote snapshot in push
/// order, each a full copy of the collection. A caller that stops polling
/// `next` keeps accumulating snapshots until it reads them or closes the
/// view; views of screens no longer shown should be closed, not parked.
pub struct ViewHandle {
    shared: Arc<ViewShared>,
    updates: mpsc::UnboundedReceiver<ViewUpdate>,
    applied: watch::Receiver<u64>,
    persist_task: Option<JoinHandle<()>>,
}

impl ViewHandle {
    pub(crate) fn new(
        shared: Arc<ViewShared>,
        updates: mpsc::UnboundedReceiver<ViewUpdate>,
        applied: watch::Receiver<u64>,
        persist_task: JoinHandle<()>,
    ) -> Self {
        Self {
            shared,
            updates,
            applied,
            persist_task: Some(persist_task),
        }
    }

    pub fn scope(&self) -> &ViewScope {
        &self.shared.scope
    }

    pub fn state(&self) -> ViewState {
        self.shared.state()
    }

    /// Next update, in emission order. `None` once the view is closed.
    pub async fn next(&mut self) -> Option<ViewUpdate> {
        self.updates.recv().await
    }

    /// Next update if one is already queued.
    pub fn try_next(&mut self) -> Option<ViewUpdate> {
        self.updates.try_recv().ok()
    }

    /// Wait until every remote push received so far has been written to the
    /// Local Store.
    pub async fn settle(&mut self) {
        let target = self.shared.pushes();
        let _ = self.applied.wait_for(|applied| *applied >= target).await;
    }

    /// Tear down without waiting: cancels the subscription and discards any
    /// queued updates. The view reads `Idle` afterwards.
    pub fn close(&mut self) {
        self.shared.teardown();
        self.updates.close();
        while self.updates.try_recv().is_ok() {}
    }

    /// Tear down and wait for already-received snapshots to be persisted.
    pub async fn deactivate(mut self) {
        self.close();
        if let Some(task) = self.persist_task.take() {
            if let Err(err) = task.await {
                tracing::error!(view = self.shared.id(), "persistence task failed: {err}");
            }
        }
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl std::fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandle")
            .field("id", &self.shared.id())
            .field("scope", &self.shared.scope)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipeshare_core::RecipeId;

    fn recipe(id: &str, owner: &str) -> Recipe {
        Recipe {
            id: RecipeId::new(id),
            title: id.into(),
            description: "d".into(),
            image_url: None,
            owner_id: Some(UserId::new(owner)),
            created_at: 1,
        }
    }

    #[test]
    fn owner_scope_filters_by_author() {
        let scope = ViewScope::Owner(UserId::new("u1"));
        let picked = scope.select(vec![recipe("a", "u1"), recipe("b", "u2")]);
        assert_eq!(picked, vec![recipe("a", "u1")]);
        assert_eq!(ViewScope::Feed.select(vec![recipe("b", "u2")]).len(), 1);
    }

    #[test]
    fn unread_pushes_are_kept_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (persist_tx, persist_rx) = watch::channel(None);
        let shared = ViewShared::new(1, ViewScope::Feed, tx, persist_tx);

        for n in 1..=50 {
            shared.on_remote_snapshot((0..n).map(|i| recipe(&format!("r{i}"), "u1")).collect());
        }

        let mut sizes = Vec::new();
        while let Ok(ViewUpdate::Snapshot { origin, recipes }) = rx.try_recv() {
            assert_eq!(origin, SnapshotOrigin::Remote);
            sizes.push(recipes.len());
        }
        assert_eq!(sizes, (1..=50).collect::<Vec<_>>());
        assert_eq!(shared.pushes(), 50);
        assert_eq!(persist_rx.borrow().as_ref().map(|(seq, _)| *seq), Some(50));
    }

    #[test]
    fn pushes_after_teardown_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (persist_tx, persist_rx) = watch::channel(None);
        let shared = ViewShared::new(1, ViewScope::Feed, tx, persist_tx);

        shared.on_remote_snapshot(vec![recipe("a", "u1")]);
        assert_eq!(shared.state(), ViewState::Live);

        shared.teardown();
        shared.teardown();
        shared.on_remote_snapshot(vec![recipe("b", "u1")]);

        assert!(matches!(rx.try_recv(), Ok(ViewUpdate::Snapshot { .. })));
        assert!(rx.try_recv().is_err());
        assert_eq!(shared.state(), ViewState::Idle);
        assert_eq!(persist_rx.borrow().as_ref().map(|(seq, _)| *seq), Some(1));
    }
}
