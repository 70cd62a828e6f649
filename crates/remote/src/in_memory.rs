//! In-memory remote collection for tests/dev.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;

use recipeshare_core::{Recipe, RecipeId, sort_newest_first};

use crate::document::{Document, recipe_from_document, recipe_to_document};
use crate::error::RemoteError;
use crate::source::{RemoteSource, SnapshotCallback};
use crate::subscription::Subscription;

/// One registered callback. Closing takes the callback under the same lock
/// delivery holds, so a closed slot never fires again.
struct SubscriberSlot {
    callback: Mutex<Option<SnapshotCallback>>,
}

impl SubscriberSlot {
    fn deliver(&self, snapshot: Vec<Recipe>) {
        let guard = match self.callback.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(cb) = guard.as_ref() {
            cb(snapshot);
        }
    }

    fn close(&self) {
        let mut guard = match self.callback.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    offline: bool,
    fail_writes: bool,
    failing_writes_left: u32,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<RecipeId, Document>,
    subscribers: Vec<(u64, Arc<SubscriberSlot>)>,
    next_subscriber: u64,
    faults: Faults,
}

impl State {
    fn snapshot(&self) -> Vec<Recipe> {
        let mut recipes: Vec<Recipe> = self
            .documents
            .iter()
            .filter_map(|(id, doc)| recipe_from_document(id, doc))
            .collect();
        sort_newest_first(&mut recipes);
        recipes
    }

    /// Fan the current snapshot out to every live subscriber, in
    /// registration order. Called with the state lock held so concurrent
    /// writers cannot interleave their emissions.
    fn emit(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, slot) in &self.subscribers {
            slot.deliver(snapshot.clone());
        }
    }

    fn check_write(&mut self) -> Result<(), RemoteError> {
        if self.faults.offline {
            return Err(RemoteError::write_failed("remote is offline"));
        }
        if self.faults.fail_writes {
            return Err(RemoteError::write_failed("write rejected"));
        }
        if self.faults.failing_writes_left > 0 {
            self.faults.failing_writes_left -= 1;
            return Err(RemoteError::write_failed("write rejected"));
        }
        Ok(())
    }
}

/// In-memory document collection with live fan-out.
///
/// - No network; all calls complete immediately
/// - Snapshots are delivered synchronously on the writer's thread
/// - Fault switches simulate outages and rejected writes
#[derive(Clone, Default)]
pub struct InMemoryRemoteSource {
    state: Arc<Mutex<State>>,
}

impl InMemoryRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the collection without notifying anyone.
    pub fn with_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let source = Self::new();
        if let Ok(mut state) = source.state.lock() {
            for r in recipes {
                state.documents.insert(r.id.clone(), recipe_to_document(&r));
            }
        }
        source
    }

    /// Simulate losing connectivity: reads report `Unavailable`, writes fail.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.offline = offline;
        }
    }

    /// Reject every write until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.fail_writes = fail;
        }
    }

    /// Reject the next `n` writes, then recover.
    pub fn fail_next_writes(&self, n: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.failing_writes_left = n;
        }
    }

    /// A write made by some other client; bypasses fault switches and
    /// notifies subscribers.
    pub fn put_external(&self, recipe: Recipe) {
        if let Ok(mut state) = self.state.lock() {
            state
                .documents
                .insert(recipe.id.clone(), recipe_to_document(&recipe));
            state.emit();
        }
    }

    /// A raw document write made by some other client.
    pub fn put_document(&self, id: RecipeId, doc: Document) {
        if let Ok(mut state) = self.state.lock() {
            state.documents.insert(id, doc);
            state.emit();
        }
    }

    /// A delete made by some other client.
    pub fn remove_external(&self, id: &RecipeId) {
        if let Ok(mut state) = self.state.lock() {
            state.documents.remove(id);
            state.emit();
        }
    }

    /// Current contents, newest first, regardless of fault switches.
    pub fn snapshot(&self) -> Vec<Recipe> {
        self.state.lock().map(|s| s.snapshot()).unwrap_or_default()
    }

    pub fn get(&self, id: &RecipeId) -> Option<Recipe> {
        let state = self.state.lock().ok()?;
        state
            .documents
            .get(id)
            .and_then(|doc| recipe_from_document(id, doc))
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().map(|s| s.subscribers.len()).unwrap_or(0)
    }

    fn lock_for_write(&self) -> Result<MutexGuard<'_, State>, RemoteError> {
        self.state
            .lock()
            .map_err(|_| RemoteError::write_failed("lock poisoned"))
    }

    fn unregister(state: &Weak<Mutex<State>>, slot: &Arc<SubscriberSlot>, key: u64) {
        slot.close();
        if let Some(state) = state.upgrade() {
            if let Ok(mut s) = state.lock() {
                s.subscribers.retain(|(k, _)| *k != key);
            }
        }
        tracing::debug!(subscription = key, "remote subscription cancelled");
    }
}

#[async_trait]
impl RemoteSource for InMemoryRemoteSource {
    async fn fetch_all(&self) -> Result<Vec<Recipe>, RemoteError> {
        let state = self
            .state
            .lock()
            .map_err(|_| RemoteError::unavailable("lock poisoned"))?;
        if state.faults.offline {
            return Err(RemoteError::unavailable("remote is offline"));
        }
        Ok(state.snapshot())
    }

    async fn subscribe(&self, on_update: SnapshotCallback) -> Result<Subscription, RemoteError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RemoteError::unavailable("lock poisoned"))?;
        if state.faults.offline {
            return Err(RemoteError::unavailable("remote is offline"));
        }

        let key = state.next_subscriber;
        state.next_subscriber += 1;

        let slot = Arc::new(SubscriberSlot {
            callback: Mutex::new(Some(on_update)),
        });
        state.subscribers.push((key, slot.clone()));

        // Initial snapshot, delivered before any later write can emit.
        slot.deliver(state.snapshot());
        drop(state);

        tracing::debug!(subscription = key, "remote subscription registered");

        let weak = Arc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            Self::unregister(&weak, &slot, key);
        }))
    }

    fn reserve_id(&self) -> RecipeId {
        RecipeId::generate()
    }

    async fn create(&self, mut recipe: Recipe) -> Result<RecipeId, RemoteError> {
        let mut state = self.lock_for_write()?;
        state.check_write()?;

        if recipe.id.as_str().is_empty() {
            recipe.id = RecipeId::generate();
        }
        let id = recipe.id.clone();
        state.documents.insert(id.clone(), recipe_to_document(&recipe));
        state.emit();
        Ok(id)
    }

    async fn update(&self, recipe: Recipe) -> Result<(), RemoteError> {
        let mut state = self.lock_for_write()?;
        state.check_write()?;

        state
            .documents
            .insert(recipe.id.clone(), recipe_to_document(&recipe));
        state.emit();
        Ok(())
    }

    async fn delete(&self, id: &RecipeId) -> Result<(), RemoteError> {
        let mut state = self.lock_for_write()?;
        state.check_write()?;

        if state.documents.remove(id).is_some() {
            state.emit();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use recipeshare_core::UserId;

    use crate::document::FieldValue;

    fn recipe(id: &str, created_at: i64) -> Recipe {
        Recipe {
            id: RecipeId::new(id),
            title: format!("title {id}"),
            description: "desc".into(),
            image_url: None,
            owner_id: Some(UserId::new("u1")),
            created_at,
        }
    }

    fn recorder() -> (SnapshotCallback, Arc<Mutex<Vec<Vec<Recipe>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let cb: SnapshotCallback = Arc::new(move |snap| s.lock().unwrap().push(snap));
        (cb, seen)
    }

    #[tokio::test]
    async fn foreign_documents_decode_with_defaults_or_are_skipped() {
        let remote = InMemoryRemoteSource::new();
        let (cb, seen) = recorder();
        let _sub = remote.subscribe(cb).await.unwrap();

        let mut undated = Document::new();
        undated.insert("title".into(), FieldValue::String("Toast".into()));
        undated.insert("description".into(), FieldValue::String("Crisp".into()));
        remote.put_document(RecipeId::new("undated"), undated);

        let mut untitled = Document::new();
        untitled.insert("description".into(), FieldValue::String("no title".into()));
        remote.put_document(RecipeId::new("untitled"), untitled);

        let all = remote.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id.as_str(), "undated");
        assert_eq!(all[0].created_at, 0);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn fetch_all_is_newest_first() {
        let remote = InMemoryRemoteSource::with_recipes(vec![recipe("a", 1), recipe("b", 3)]);
        let all = remote.fetch_all().await.unwrap();
        assert_eq!(all[0].id.as_str(), "b");
    }

    #[tokio::test]
    async fn subscribe_delivers_initial_and_full_snapshots() {
        let remote = InMemoryRemoteSource::with_recipes(vec![recipe("a", 1)]);
        let (cb, seen) = recorder();
        let _sub = remote.subscribe(cb).await.unwrap();

        remote.create(recipe("b", 2)).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[1].len(), 2);
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_receiving() {
        let remote = InMemoryRemoteSource::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let sub = remote
            .subscribe(Arc::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();

        sub.cancel();
        sub.cancel();
        remote.create(recipe("a", 1)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(remote.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn offline_source_reports_unavailable_and_rejects_writes() {
        let remote = InMemoryRemoteSource::new();
        remote.set_offline(true);

        assert!(matches!(remote.fetch_all().await, Err(RemoteError::Unavailable(_))));
        let (cb, _) = recorder();
        assert!(remote.subscribe(cb).await.is_err());
        assert!(matches!(
            remote.create(recipe("a", 1)).await,
            Err(RemoteError::WriteFailed(_))
        ));
    }

    #[tokio::test]
    async fn update_creates_missing_and_delete_is_idempotent() {
        let remote = InMemoryRemoteSource::new();
        remote.update(recipe("a", 1)).await.unwrap();
        assert!(remote.get(&RecipeId::new("a")).is_some());

        remote.delete(&RecipeId::new("a")).await.unwrap();
        remote.delete(&RecipeId::new("a")).await.unwrap();
        assert!(remote.snapshot().is_empty());
    }

    #[tokio::test]
    async fn fail_next_writes_recovers() {
        let remote = InMemoryRemoteSource::new();
        remote.fail_next_writes(1);
        assert!(remote.create(recipe("a", 1)).await.is_err());
        assert!(remote.create(recipe("a", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn create_assigns_id_when_blank() {
        let remote = InMemoryRemoteSource::new();
        let id = remote.create(recipe("", 1)).await.unwrap();
        assert!(!id.as_str().is_empty());
        assert!(remote.get(&id).is_some());
    }
}
