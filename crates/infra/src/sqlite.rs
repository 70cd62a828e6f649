//! SQLite pool setup shared by the cache and the unsynced ledger.
//!
//! Both tables live in one database file: `{app_data_dir}/recipeshare/cache.db`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

/// Open (creating if needed) the cache database at `path`.
pub async fn open_file_pool(path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache directory at {:?}", parent))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to create SQLite pool at {:?}", path))
}

/// A private in-memory database.
///
/// Limited to one connection: every connection to `:memory:` would otherwise
/// see its own empty database.
pub async fn open_memory_pool() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .context("invalid in-memory SQLite URL")?;

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to create in-memory SQLite pool")
}

/// Resolve the default cache database path:
/// `{app_data_dir}/recipeshare/cache.db`.
pub fn default_cache_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("recipeshare");
    path.push("cache.db");
    Ok(path)
}
