//! Local Store: durable, offline-available recipe cache.
//!
//! Reads never fail: an unreadable cache is logged and reported as empty so
//! callers degrade to remote-only. Writes report `LocalStoreError`.
//!
//! `replace_all` is atomic with respect to readers: a concurrent `get_all`
//! sees either the old set or the new set, never a partially-cleared one.
//! Writers are serialized.

pub mod in_memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use recipeshare_core::{Recipe, RecipeId, UserId};

use crate::error::LocalStoreError;

pub use in_memory::InMemoryLocalStore;
pub use sqlite::SqliteLocalStore;

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// All cached recipes, newest first.
    async fn get_all(&self) -> Vec<Recipe>;

    async fn get_by_id(&self, id: &RecipeId) -> Option<Recipe>;

    /// Cached recipes authored by `owner`, newest first.
    async fn get_by_owner(&self, owner: &UserId) -> Vec<Recipe>;

    /// Insert or replace by id.
    async fn upsert_many(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError>;

    /// No-op if absent.
    async fn delete_by_id(&self, id: &RecipeId) -> Result<(), LocalStoreError>;

    /// Clear and repopulate in one step.
    async fn replace_all(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError>;
}

#[async_trait]
impl<S> LocalStore for Arc<S>
where
    S: LocalStore + ?Sized,
{
    async fn get_all(&self) -> Vec<Recipe> {
        (**self).get_all().await
    }

    async fn get_by_id(&self, id: &RecipeId) -> Option<Recipe> {
        (**self).get_by_id(id).await
    }

    async fn get_by_owner(&self, owner: &UserId) -> Vec<Recipe> {
        (**self).get_by_owner(owner).await
    }

    async fn upsert_many(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError> {
        (**self).upsert_many(recipes).await
    }

    async fn delete_by_id(&self, id: &RecipeId) -> Result<(), LocalStoreError> {
        (**self).delete_by_id(id).await
    }

    async fn replace_all(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError> {
        (**self).replace_all(recipes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn recipe(id: u16, created_at: i64) -> Recipe {
        Recipe {
            id: RecipeId::new(format!("r{id:03}")),
            title: format!("title {id}"),
            description: "desc".into(),
            image_url: None,
            owner_id: None,
            created_at,
        }
    }

    fn is_newest_first(recipes: &[Recipe]) -> bool {
        recipes.windows(2).all(|w| {
            w[0].created_at > w[1].created_at
                || (w[0].created_at == w[1].created_at && w[0].id < w[1].id)
        })
    }

    /// Distinct ids with colliding timestamps, in arbitrary insertion order.
    fn shuffled_rows() -> impl Strategy<Value = Vec<(u16, i64)>> {
        proptest::collection::hash_map(0u16..500, 0i64..10, 0..40)
            .prop_flat_map(|rows| Just(rows.into_iter().collect::<Vec<_>>()).prop_shuffle())
    }

    async fn load_in_batches(store: &dyn LocalStore, rows: &[(u16, i64)], split: usize) {
        let batch: Vec<Recipe> = rows.iter().map(|(id, ts)| recipe(*id, *ts)).collect();
        let (first, second) = batch.split_at(split.min(batch.len()));
        store.upsert_many(first.to_vec()).await.unwrap();
        store.upsert_many(second.to_vec()).await.unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: `get_all` is newest first whatever order rows were inserted in.
        #[test]
        fn get_all_orders_any_insertion_permutation(rows in shuffled_rows(), split in 0usize..40) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let memory = InMemoryLocalStore::new();
                let sqlite = SqliteLocalStore::in_memory().await.unwrap();
                load_in_batches(&memory, &rows, split).await;
                load_in_batches(&sqlite, &rows, split).await;

                let from_memory = memory.get_all().await;
                let from_sqlite = sqlite.get_all().await;
                prop_assert_eq!(from_memory.len(), rows.len());
                prop_assert!(is_newest_first(&from_memory));
                prop_assert_eq!(&from_memory, &from_sqlite);
                Ok(())
            })?;
        }
    }
}
