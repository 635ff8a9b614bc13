//! Periodic and on-demand reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

use super::{Reconciler, ReconcileReport};
use crate::remote::RemoteStore;

/// Cloneable handle used to poke or stop a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    trigger: Arc<Notify>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    /// Request a pass as soon as possible, e.g. when connectivity returns.
    ///
    /// Triggers arriving while a pass runs collapse into one follow-up pass.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stop the loop after the current pass.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Runs `reconcile_all` for one user on a fixed interval.
pub struct ReconcileScheduler<R> {
    reconciler: Reconciler<R>,
    user_id: String,
    interval: Duration,
    handle: SchedulerHandle,
}

impl<R: RemoteStore> ReconcileScheduler<R> {
    pub fn new(reconciler: Reconciler<R>, user_id: impl Into<String>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            reconciler,
            user_id: user_id.into(),
            interval,
            handle: SchedulerHandle {
                trigger: Arc::new(Notify::new()),
                shutdown: Arc::new(shutdown),
            },
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Loop until shut down, calling `on_report` after every pass.
    ///
    /// The first pass starts immediately. Ticks missed while a pass is running
    /// are skipped, not queued. Pass errors are logged and the loop goes on.
    pub async fn run<F>(&self, mut on_report: F)
    where
        F: FnMut(&ReconcileReport),
    {
        let mut shutdown = self.handle.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            "Reconcile scheduler started for {} every {}s",
            self.user_id,
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.handle.trigger.notified() => {
                    tracing::debug!("Reconcile triggered on demand");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.reconciler.reconcile_all(&self.user_id).await {
                Ok(report) => on_report(&report),
                Err(error) => tracing::warn!("Scheduled reconcile failed: {}", error),
            }

            if *shutdown.borrow() {
                break;
            }
        }

        tracing::info!("Reconcile scheduler stopped for {}", self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemoteStore;
    use crate::services::{DocumentManager, LocalStore};
    use crate::sync::ReconcileOutcome;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_runs_on_start_and_on_trigger_until_shutdown() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let remote = InMemoryRemoteStore::new();
        DocumentManager::new(store.clone(), "laptop")
            .create("user-1", "Scheduled")
            .await
            .unwrap();

        let scheduler = ReconcileScheduler::new(
            Reconciler::new(store, remote.clone()),
            "user-1",
            Duration::from_secs(3600),
        );
        let handle = scheduler.handle();
        let mut outcomes = Vec::new();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            handle.trigger();
            tokio::time::sleep(Duration::from_millis(200)).await;
            handle.shutdown();
        };
        tokio::join!(scheduler.run(|report| outcomes.push(report.outcome)), driver);

        assert_eq!(
            outcomes,
            vec![ReconcileOutcome::Completed, ReconcileOutcome::Completed]
        );
        assert_eq!(remote.len(), 1);
        assert_eq!(remote.upsert_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_passes_are_reported() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let remote = InMemoryRemoteStore::new();
        remote.set_online(false);

        let scheduler = ReconcileScheduler::new(
            Reconciler::new(store, remote),
            "user-1",
            Duration::from_secs(3600),
        );
        let handle = scheduler.handle();
        let mut outcomes = Vec::new();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.shutdown();
        };
        tokio::join!(scheduler.run(|report| outcomes.push(report.outcome)), driver);

        assert_eq!(outcomes, vec![ReconcileOutcome::Offline]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_before_run_returns_immediately() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scheduler = ReconcileScheduler::new(
            Reconciler::new(store, InMemoryRemoteStore::new()),
            "user-1",
            Duration::from_secs(1),
        );
        scheduler.handle().shutdown();

        let mut passes = 0;
        scheduler.run(|_| passes += 1).await;
        assert_eq!(passes, 0);
    }
}
