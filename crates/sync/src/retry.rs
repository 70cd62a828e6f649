//! Background replay of unsynced writes.
//!
//! Off by default: failed writes are surfaced to the caller, who may call
//! `Reconciler::retry_unsynced`. With `SyncConfig::auto_retry` the app starts
//! a `RetryWorker` that replays the ledger periodically and backs off while
//! the remote keeps rejecting writes.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::reconciler::Reconciler;

/// Handle to a running retry loop.
#[derive(Debug)]
pub struct RetryWorker {
    shutdown: Arc<Notify>,
    join: Option<JoinHandle<()>>,
}

impl RetryWorker {
    /// Spawn the loop if the reconciler's config enables it.
    pub fn spawn_if_enabled(reconciler: &Reconciler) -> Option<Self> {
        reconciler
            .config()
            .auto_retry
            .then(|| Self::spawn(reconciler.clone()))
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(reconciler: Reconciler) -> Self {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let join = tokio::spawn(async move {
            tracing::info!("retry worker started");
            let config = reconciler.config().clone();
            let mut consecutive_failures = 0u32;

            loop {
                let delay = config.delay_after_failures(consecutive_failures);
                tokio::select! {
                    _ = signal.notified() => {
                        tracing::info!("retry worker received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                match reconciler.retry_where(|w| config.should_retry(w.attempts)).await {
                    Ok(outcome) if outcome.attempted == 0 => {
                        consecutive_failures = 0;
                    }
                    Ok(outcome) if outcome.is_clean() => {
                        tracing::info!(synced = outcome.synced, "retry pass synced all pending writes");
                        consecutive_failures = 0;
                    }
                    Ok(outcome) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        tracing::warn!(
                            synced = outcome.synced,
                            failed = outcome.failed.len(),
                            consecutive_failures,
                            "retry pass left writes pending"
                        );
                    }
                    Err(err) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        tracing::error!(consecutive_failures, "retry pass failed: {err}");
                    }
                }
            }

            tracing::info!("retry worker stopped");
        });

        Self {
            shutdown,
            join: Some(join),
        }
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                tracing::error!("retry worker panicked: {err}");
            }
        }
    }
}

impl Drop for RetryWorker {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use recipeshare_core::{RecipeDraft, UserId};
    use recipeshare_infra::InMemoryLocalStore;
    use recipeshare_remote::{InMemoryRemoteSource, InMemorySession, Session};

    use crate::config::SyncConfig;

    #[tokio::test(start_paused = true)]
    async fn worker_replays_failed_write_once_remote_recovers() {
        let remote = InMemoryRemoteSource::new();
        let reconciler = Reconciler::new(
            Arc::new(InMemoryLocalStore::new()),
            Arc::new(remote.clone()),
            Arc::new(InMemorySession::signed_in(Session::new(UserId::new("u1")))),
        )
        .with_config(
            SyncConfig::default()
                .with_auto_retry(true)
                .with_retry_interval(Duration::from_secs(5))
                .with_backoff(Duration::from_secs(1), Duration::from_secs(8)),
        );

        remote.set_fail_writes(true);
        let err = reconciler
            .create(RecipeDraft::new("Soup", "Warm"))
            .await
            .unwrap_err();
        assert!(err.is_remote_write_failure());

        let worker = RetryWorker::spawn_if_enabled(&reconciler).expect("auto retry enabled");

        // First pass fails and backs off.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(reconciler.unsynced().await.unwrap().len(), 1);

        remote.set_fail_writes(false);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(reconciler.unsynced().await.unwrap().is_empty());
        assert_eq!(remote.snapshot().len(), 1);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn disabled_by_default() {
        let reconciler = Reconciler::new(
            Arc::new(InMemoryLocalStore::new()),
            Arc::new(InMemoryRemoteSource::new()),
            Arc::new(InMemorySession::new()),
        );
        assert!(RetryWorker::spawn_if_enabled(&reconciler).is_none());
    }
}
