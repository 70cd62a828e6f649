//! Service graph: stores, remote collaborators, reconciler, feeds.

use std::sync::Arc;

use anyhow::Context;

use recipeshare_infra::{
    InMemoryLocalStore, InMemoryUnsyncedLedger, LocalStore, SqliteLocalStore, SqliteUnsyncedLedger,
    UnsyncedLedger,
};
use recipeshare_remote::{
    InMemoryObjectStore, InMemoryProfileDirectory, InMemoryRemoteSource, InMemorySession, LocalObjectStore,
    ObjectStore,
};
use recipeshare_sync::{ProfileService, Reconciler};
use recipeshare_trending::{SpoonacularClient, TrendingFeed};

use crate::config::AppConfig;

/// Everything a front end needs, wired once at startup.
pub struct AppServices {
    pub session: Arc<InMemorySession>,
    pub remote: Arc<InMemoryRemoteSource>,
    pub reconciler: Reconciler,
    pub profiles: ProfileService,
    pub trending: TrendingFeed,
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let (local, ledger) = build_stores(config).await?;

    let objects: Arc<dyn ObjectStore> = match &config.upload_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "storing uploads on disk");
            Arc::new(LocalObjectStore::new(dir.clone(), format!("file://{}", dir.display())))
        }
        None => Arc::new(InMemoryObjectStore::new()),
    };

    let session = Arc::new(InMemorySession::new());
    let remote = Arc::new(InMemoryRemoteSource::new());

    let reconciler = Reconciler::new(local, remote.clone(), session.clone())
        .with_ledger(ledger)
        .with_object_store(objects.clone())
        .with_config(config.sync.clone());

    let profiles = ProfileService::new(Arc::new(InMemoryProfileDirectory::new()), session.clone())
        .with_object_store(objects);

    if config.trending.api_key.is_none() {
        tracing::warn!("SPOONACULAR_API_KEY not set; trending refreshes will fail");
    }
    let trending = TrendingFeed::new(
        Arc::new(SpoonacularClient::new(config.trending.clone())),
        config.trending.count,
    );

    Ok(AppServices {
        session,
        remote,
        reconciler,
        profiles,
        trending,
    })
}

async fn build_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn LocalStore>, Arc<dyn UnsyncedLedger>)> {
    if config.persistent_cache {
        match &config.cache_db {
            Some(path) => {
                let store = SqliteLocalStore::open(path)
                    .await
                    .with_context(|| format!("failed to open recipe cache at {:?}", path))?;
                let ledger = SqliteUnsyncedLedger::new(store.pool().clone())
                    .await
                    .context("failed to open unsynced ledger")?;
                tracing::info!(path = %path.display(), "using SQLite recipe cache");
                return Ok((Arc::new(store), Arc::new(ledger)));
            }
            None => {
                tracing::warn!("persistent cache requested but no cache path resolved, falling back to in-memory");
            }
        }
    }

    Ok((
        Arc::new(InMemoryLocalStore::new()),
        Arc::new(InMemoryUnsyncedLedger::new()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipeshare_core::{RecipeDraft, UserId};
    use recipeshare_remote::Session;

    fn temp_db(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("recipeshare-app-{}-{name}", std::process::id()))
            .join("cache.db")
    }

    #[tokio::test]
    async fn in_memory_graph_creates_and_reads_back() {
        let services = build_services(&AppConfig::default()).await.unwrap();
        services
            .session
            .sign_in(Session::new(UserId::new("u1")).with_display_name("Ada"));

        let created = services
            .reconciler
            .create(RecipeDraft::new("Soup", "Hot"))
            .await
            .unwrap();

        assert_eq!(created.owner_id, Some(UserId::new("u1")));
        assert_eq!(services.reconciler.get(&created.id).await, Some(created.clone()));
        assert!(services.remote.get(&created.id).is_some());
        assert_eq!(services.profiles.load_or_init().await.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn persistent_graph_keeps_cache_across_restarts() {
        let path = temp_db("restart");
        let _ = std::fs::remove_file(&path);
        let config = AppConfig {
            cache_db: Some(path.clone()),
            persistent_cache: true,
            ..AppConfig::default()
        };

        let id = {
            let services = build_services(&config).await.unwrap();
            services
                .reconciler
                .create(RecipeDraft::new("Bread", "Knead"))
                .await
                .unwrap()
                .id
        };

        let reopened = build_services(&config).await.unwrap();
        assert_eq!(reopened.reconciler.get(&id).await.map(|r| r.title), Some("Bread".into()));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
