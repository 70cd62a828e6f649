use recipeshare_app::{AppConfig, build_services};
use recipeshare_core::{RecipeDraft, UserId};
use recipeshare_remote::Session;
use recipeshare_sync::{RetryWorker, ViewScope, ViewUpdate};

/// Headless walk through the main flows: sign in, open the feed, publish a
/// recipe, then load the trending list.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    recipeshare_observability::init_with(config.log_format);

    let services = build_services(&config).await?;
    let retry = RetryWorker::spawn_if_enabled(&services.reconciler);

    services
        .session
        .sign_in(Session::new(UserId::new("demo-user")).with_display_name("Demo Cook"));
    let profile = services.profiles.load_or_init().await?;
    tracing::info!(user = %profile.user_id, name = %profile.name, "signed in");

    let mut feed = services.reconciler.activate(ViewScope::Feed).await;
    log_update(feed.next().await);

    match services
        .reconciler
        .create(RecipeDraft::new("Tomato soup", "Roast tomatoes, blend, season."))
        .await
    {
        Ok(recipe) => tracing::info!(recipe = %recipe.id, "recipe published"),
        Err(err) => tracing::warn!("recipe saved locally but not synced: {err}"),
    }
    while let Some(update) = feed.try_next() {
        log_update(Some(update));
    }
    feed.settle().await;
    feed.deactivate().await;

    let trending = services.trending.refresh().await;
    match trending.error_message {
        Some(message) => tracing::warn!("{message}"),
        None => tracing::info!(count = trending.recipes.len(), "trending recipes loaded"),
    }

    let pending = services.reconciler.unsynced().await?;
    if !pending.is_empty() {
        tracing::warn!(pending = pending.len(), "exiting with unsynced writes");
    }

    if let Some(worker) = retry {
        worker.shutdown().await;
    }
    Ok(())
}

fn log_update(update: Option<ViewUpdate>) {
    match update {
        Some(ViewUpdate::Snapshot { origin, recipes }) => {
            tracing::info!(?origin, count = recipes.len(), "feed snapshot");
        }
        Some(ViewUpdate::RemoteUnavailable(reason)) => {
            tracing::warn!("showing cached recipes, remote unavailable: {reason}");
        }
        None => tracing::debug!("feed closed"),
    }
}
