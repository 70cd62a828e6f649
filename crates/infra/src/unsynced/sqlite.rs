//! SQLite-backed unsynced ledger (`unsynced_writes` table).
//!
//! Shares the cache database file with `SqliteLocalStore` when built from its
//! pool, so pending writes survive restarts alongside the cached recipes.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use recipeshare_core::{Recipe, RecipeId};

use super::{PendingOp, PendingWrite, UnsyncedLedger};
use crate::error::LocalStoreError;

#[derive(Debug, Clone)]
pub struct SqliteUnsyncedLedger {
    pool: SqlitePool,
}

impl SqliteUnsyncedLedger {
    pub async fn new(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS unsynced_writes (
                id              TEXT PRIMARY KEY,
                op              TEXT NOT NULL,
                recipe_id       TEXT NOT NULL UNIQUE,
                payload         TEXT NULL,
                attempts        INTEGER NOT NULL,
                last_error      TEXT NULL,
                recorded_at     TEXT NOT NULL,
                last_attempt_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create unsynced_writes table")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl UnsyncedLedger for SqliteUnsyncedLedger {
    async fn record(&self, write: PendingWrite) -> Result<(), LocalStoreError> {
        let payload = write
            .recipe
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to serialize pending recipe")?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin ledger transaction")?;

        sqlx::query("DELETE FROM unsynced_writes WHERE recipe_id = ?1")
            .bind(write.recipe_id.as_str())
            .execute(&mut *tx)
            .await
            .context("failed to drop superseded pending write")?;

        sqlx::query(
            r#"
            INSERT INTO unsynced_writes (
                id,
                op,
                recipe_id,
                payload,
                attempts,
                last_error,
                recorded_at,
                last_attempt_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(write.id.to_string())
        .bind(write.op.as_str())
        .bind(write.recipe_id.as_str())
        .bind(payload)
        .bind(i64::from(write.attempts))
        .bind(write.last_error.as_deref())
        .bind(timestamp(&write.recorded_at))
        .bind(timestamp(&write.last_attempt_at))
        .execute(&mut *tx)
        .await
        .context("failed to insert pending write")?;

        tx.commit().await.context("failed to commit pending write")?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PendingWrite>, LocalStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                op,
                recipe_id,
                payload,
                attempts,
                last_error,
                recorded_at,
                last_attempt_at
            FROM unsynced_writes
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list pending writes")?;

        let mut writes = Vec::with_capacity(rows.len());
        for row in rows {
            writes.push(row_to_pending(row)?);
        }
        Ok(writes)
    }

    async fn mark_attempt_failed(&self, id: Uuid, error: String) -> Result<(), LocalStoreError> {
        sqlx::query(
            r#"
            UPDATE unsynced_writes
            SET attempts = attempts + 1,
                last_error = ?2,
                last_attempt_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .bind(error)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .context("failed to mark pending write as failed")?;

        Ok(())
    }

    async fn resolve(&self, id: Uuid) -> Result<(), LocalStoreError> {
        sqlx::query("DELETE FROM unsynced_writes WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("failed to resolve pending write")?;

        Ok(())
    }
}

/// Fixed-width RFC 3339 so `ORDER BY recorded_at` sorts chronologically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_pending(row: sqlx::sqlite::SqliteRow) -> anyhow::Result<PendingWrite> {
    let id_str: String = row.try_get("id")?;
    let op_str: String = row.try_get("op")?;
    let recipe_id: String = row.try_get("recipe_id")?;
    let payload: Option<String> = row.try_get("payload")?;
    let attempts: i64 = row.try_get("attempts")?;
    let last_error: Option<String> = row.try_get("last_error")?;
    let recorded_at_str: String = row.try_get("recorded_at")?;
    let last_attempt_at_str: String = row.try_get("last_attempt_at")?;

    let id = Uuid::parse_str(&id_str).context("invalid pending write id")?;
    let op = PendingOp::parse(&op_str).with_context(|| format!("invalid pending op: {op_str}"))?;
    let recipe = payload
        .map(|p| serde_json::from_str::<Recipe>(&p))
        .transpose()
        .context("invalid pending recipe payload")?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
        .context("invalid recorded_at")?
        .with_timezone(&Utc);
    let last_attempt_at = DateTime::parse_from_rfc3339(&last_attempt_at_str)
        .context("invalid last_attempt_at")?
        .with_timezone(&Utc);

    Ok(PendingWrite {
        id,
        op,
        recipe_id: RecipeId::new(recipe_id),
        recipe,
        attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        last_error,
        recorded_at,
        last_attempt_at,
    })
}
