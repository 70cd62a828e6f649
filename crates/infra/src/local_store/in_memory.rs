use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use recipeshare_core::{Recipe, RecipeId, UserId, sort_newest_first};

use super::LocalStore;
use crate::error::LocalStoreError;

/// In-memory recipe cache for tests/dev.
///
/// The map sits behind one `RwLock`: `replace_all` builds the new map first
/// and swaps it in under the write lock, so readers never see a torn state.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    inner: RwLock<HashMap<RecipeId, Recipe>>,
    failing: AtomicBool,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a corrupted/unreadable cache: reads come back empty and
    /// writes fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    fn read_filtered(&self, keep: impl Fn(&Recipe) -> bool) -> Vec<Recipe> {
        if self.is_failing() {
            tracing::error!("local store read failed; serving empty cache");
            return Vec::new();
        }
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => {
                tracing::error!("local store lock poisoned; serving empty cache");
                return Vec::new();
            }
        };
        let mut recipes: Vec<Recipe> = map.values().filter(|r| keep(r)).cloned().collect();
        sort_newest_first(&mut recipes);
        recipes
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<RecipeId, Recipe>>, LocalStoreError> {
        if self.is_failing() {
            return Err(LocalStoreError::failure("simulated local store failure"));
        }
        self.inner
            .write()
            .map_err(|_| LocalStoreError::failure("lock poisoned"))
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get_all(&self) -> Vec<Recipe> {
        self.read_filtered(|_| true)
    }

    async fn get_by_id(&self, id: &RecipeId) -> Option<Recipe> {
        if self.is_failing() {
            tracing::error!(recipe = %id, "local store read failed");
            return None;
        }
        let map = self.inner.read().ok()?;
        map.get(id).cloned()
    }

    async fn get_by_owner(&self, owner: &UserId) -> Vec<Recipe> {
        self.read_filtered(|r| r.is_owned_by(owner))
    }

    async fn upsert_many(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError> {
        let mut map = self.write()?;
        for r in recipes {
            map.insert(r.id.clone(), r);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &RecipeId) -> Result<(), LocalStoreError> {
        let mut map = self.write()?;
        map.remove(id);
        Ok(())
    }

    async fn replace_all(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError> {
        let fresh: HashMap<RecipeId, Recipe> =
            recipes.into_iter().map(|r| (r.id.clone(), r)).collect();
        let mut map = self.write()?;
        *map = fresh;
        Ok(())
    }
}
