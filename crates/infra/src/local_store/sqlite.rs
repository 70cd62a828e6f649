//! SQLite-backed recipe cache.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use recipeshare_core::{Recipe, RecipeId, UserId};

use super::LocalStore;
use crate::error::LocalStoreError;
use crate::sqlite::{open_file_pool, open_memory_pool};

/// Durable recipe cache (one row per recipe).
///
/// Writers take `write_gate` so `upsert_many` and `replace_all` from
/// different views run one at a time; each runs in a single transaction, so
/// readers observe either the committed before-state or after-state.
#[derive(Debug)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
    write_gate: Mutex<()>,
}

impl SqliteLocalStore {
    /// Open the cache database file at `path` (created if missing).
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let pool = open_file_pool(path).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database (tests/dev).
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = open_memory_pool().await?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the `recipes` table if needed.
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recipes (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT NOT NULL,
                image_url   TEXT NULL,
                owner_id    TEXT NULL,
                created_at  INTEGER NOT NULL,
                cached_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create recipes table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS recipes_owner_idx ON recipes (owner_id)")
            .execute(&pool)
            .await
            .context("failed to create recipes owner index")?;

        Ok(Self {
            pool,
            write_gate: Mutex::new(()),
        })
    }

    /// The underlying pool, for sharing the database file with the ledger.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn try_get_all(&self) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, image_url, owner_id, created_at
            FROM recipes
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list cached recipes")?;

        rows.into_iter().map(row_to_recipe).collect()
    }

    async fn try_get_by_owner(&self, owner: &UserId) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, image_url, owner_id, created_at
            FROM recipes
            WHERE owner_id = ?1
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to list cached recipes by owner")?;

        rows.into_iter().map(row_to_recipe).collect()
    }

    async fn try_get_by_id(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, image_url, owner_id, created_at
            FROM recipes
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch cached recipe")?;

        row.map(row_to_recipe).transpose()
    }
}

async fn upsert_in_tx(tx: &mut Transaction<'_, Sqlite>, recipe: &Recipe, now: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recipes (id, title, description, image_url, owner_id, created_at, cached_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id)
        DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            image_url = excluded.image_url,
            owner_id = excluded.owner_id,
            created_at = excluded.created_at,
            cached_at = excluded.cached_at
        "#,
    )
    .bind(recipe.id.as_str())
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.image_url.as_deref())
    .bind(recipe.owner_id.as_ref().map(|u| u.as_str()))
    .bind(recipe.created_at)
    .bind(now)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("failed to upsert cached recipe {}", recipe.id))?;

    Ok(())
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get_all(&self) -> Vec<Recipe> {
        match self.try_get_all().await {
            Ok(recipes) => recipes,
            Err(err) => {
                tracing::error!("failed to read recipe cache: {err:?}");
                Vec::new()
            }
        }
    }

    async fn get_by_id(&self, id: &RecipeId) -> Option<Recipe> {
        match self.try_get_by_id(id).await {
            Ok(recipe) => recipe,
            Err(err) => {
                tracing::error!(recipe = %id, "failed to read cached recipe: {err:?}");
                None
            }
        }
    }

    async fn get_by_owner(&self, owner: &UserId) -> Vec<Recipe> {
        match self.try_get_by_owner(owner).await {
            Ok(recipes) => recipes,
            Err(err) => {
                tracing::error!(owner = %owner, "failed to read recipe cache: {err:?}");
                Vec::new()
            }
        }
    }

    async fn upsert_many(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError> {
        let _gate = self.write_gate.lock().await;
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin upsert transaction")?;
        for recipe in &recipes {
            upsert_in_tx(&mut tx, recipe, &now).await?;
        }
        tx.commit().await.context("failed to commit upsert")?;

        Ok(())
    }

    async fn delete_by_id(&self, id: &RecipeId) -> Result<(), LocalStoreError> {
        let _gate = self.write_gate.lock().await;

        sqlx::query("DELETE FROM recipes WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .context("failed to delete cached recipe")?;

        Ok(())
    }

    async fn replace_all(&self, recipes: Vec<Recipe>) -> Result<(), LocalStoreError> {
        let _gate = self.write_gate.lock().await;
        let now = Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin replace transaction")?;

        sqlx::query("DELETE FROM recipes")
            .execute(&mut *tx)
            .await
            .context("failed to clear recipe cache")?;

        for recipe in &recipes {
            upsert_in_tx(&mut tx, recipe, &now).await?;
        }

        tx.commit().await.context("failed to commit replace")?;
        tracing::debug!(rows = recipes.len(), "recipe cache replaced");

        Ok(())
    }
}

/// Map a database row into a `Recipe`.
fn row_to_recipe(row: sqlx::sqlite::SqliteRow) -> anyhow::Result<Recipe> {
    let id: String = row.try_get("id")?;
    let title: String = row.try_get("title")?;
    let description: String = row.try_get("description")?;
    let image_url: Option<String> = row.try_get("image_url")?;
    let owner_id: Option<String> = row.try_get("owner_id")?;
    let created_at: i64 = row.try_get("created_at")?;

    Ok(Recipe {
        id: RecipeId::new(id),
        title,
        description,
        image_url,
        owner_id: owner_id.map(UserId::new),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use recipeshare_core::sort_newest_first;

    fn recipe(id: &str, created_at: i64, owner: Option<&str>) -> Recipe {
        Recipe {
            id: RecipeId::new(id),
            title: format!("title {id}"),
            description: "desc".into(),
            image_url: Some(format!("https://img/{id}")),
            owner_id: owner.map(UserId::new),
            created_at,
        }
    }

    #[tokio::test]
    async fn round_trips_rows_and_orders_newest_first() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store
            .upsert_many(vec![recipe("a", 1, Some("u1")), recipe("b", 5, None)])
            .await
            .unwrap();

        let all = store.get_all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], recipe("b", 5, None));
        assert_eq!(
            store.get_by_id(&RecipeId::new("a")).await,
            Some(recipe("a", 1, Some("u1")))
        );
        assert_eq!(store.get_by_owner(&UserId::new("u1")).await.len(), 1);
    }

    #[tokio::test]
    async fn replace_all_evicts_rows_missing_from_snapshot() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store
            .upsert_many(vec![recipe("stale", 1, None), recipe("kept", 2, None)])
            .await
            .unwrap();

        let mut kept = recipe("kept", 2, None);
        kept.title = "remote title".into();
        store.replace_all(vec![kept.clone()]).await.unwrap();

        assert_eq!(store.get_all().await, vec![kept]);
        assert!(store.get_by_id(&RecipeId::new("stale")).await.is_none());
    }

    #[tokio::test]
    async fn upsert_twice_is_idempotent() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        let batch = vec![recipe("a", 1, None), recipe("b", 2, None)];

        store.upsert_many(batch.clone()).await.unwrap();
        let first = store.get_all().await;
        store.upsert_many(batch).await.unwrap();

        assert_eq!(store.get_all().await, first);
    }

    #[tokio::test]
    async fn delete_missing_row_is_noop() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.delete_by_id(&RecipeId::new("nope")).await.unwrap();
        assert!(store.get_all().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_never_see_torn_replace_on_file_db() {
        let dir = std::env::temp_dir().join(format!("recipeshare-torn-{}", uuid::Uuid::now_v7().simple()));
        let store = Arc::new(SqliteLocalStore::open(&dir.join("cache.db")).await.unwrap());

        let before: Vec<Recipe> = (0..40).map(|i| recipe(&format!("old{i:02}"), i, None)).collect();
        let after: Vec<Recipe> = (0..25).map(|i| recipe(&format!("new{i:02}"), 100 + i, Some("u1"))).collect();
        store.replace_all(before.clone()).await.unwrap();

        let mut expected_before = before.clone();
        sort_newest_first(&mut expected_before);
        let mut expected_after = after.clone();
        sort_newest_first(&mut expected_after);

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..60 {
                    let next = if i % 2 == 0 { after.clone() } else { before.clone() };
                    store.replace_all(next).await.unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..3 {
            let store = store.clone();
            let (eb, ea) = (expected_before.clone(), expected_after.clone());
            readers.push(tokio::spawn(async move {
                for _ in 0..60 {
                    let seen = store.get_all().await;
                    assert!(seen == eb || seen == ea, "torn read of {} rows", seen.len());
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }

        store.pool().close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
