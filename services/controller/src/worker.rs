//! Sync background worker.
//!
//! Runs a pass at startup, whenever a trigger fires, and on a periodic
//! resync interval. Failed passes with transient causes are requeued with
//! exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use tsync_reconcile::{Reconciler, SyncError, SyncOutcome};

use crate::backoff::RequeueBackoff;

/// Requests a pass from a running [`SyncWorker`].
///
/// Triggers that arrive while a pass is running collapse into one follow-up
/// pass.
#[derive(Debug, Clone, Default)]
pub struct TriggerHandle {
    notify: Arc<Notify>,
}

impl TriggerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a full recomputation.
    pub fn trigger(&self) {
        self.notify.notify_one();
    }

    async fn fired(&self) {
        self.notify.notified().await;
    }
}

/// Drives the reconciler from a single task, so passes never overlap.
pub struct SyncWorker {
    reconciler: Reconciler,
    interval: Duration,
    backoff: RequeueBackoff,
    trigger: TriggerHandle,
}

impl SyncWorker {
    pub fn new(reconciler: Reconciler, interval: Duration, backoff: RequeueBackoff) -> Self {
        Self {
            reconciler,
            interval,
            backoff,
            trigger: TriggerHandle::new(),
        }
    }

    /// Handle for requesting passes while the worker runs.
    pub fn trigger_handle(&self) -> TriggerHandle {
        self.trigger.clone()
    }

    /// Run a single pass and return its outcome.
    pub async fn run_once(&self) -> Result<SyncOutcome, SyncError> {
        self.reconciler.reconcile().await
    }

    /// Run the worker until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting sync worker"
        );

        let mut backoff = self.backoff.clone();
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut requeue_at = self.run_pass(&mut backoff).await;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.trigger.fired() => {
                    debug!("Pass triggered");
                }
                _ = interval.tick() => {
                    debug!("Periodic resync");
                }
                _ = wait_until(requeue_at) => {
                    debug!(failures = backoff.failures(), "Requeued pass");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            requeue_at = self.run_pass(&mut backoff).await;
        }

        info!("Sync worker shutting down");
    }

    /// Run one pass, returning when to requeue it if it failed transiently.
    async fn run_pass(&self, backoff: &mut RequeueBackoff) -> Option<Instant> {
        match self.reconciler.reconcile().await {
            Ok(outcome) => {
                backoff.reset();
                if outcome.updated {
                    info!(
                        outcome = outcome.publish.as_str(),
                        revision = outcome.publish.revision(),
                        nodes = outcome.nodes,
                        "Pass published"
                    );
                } else {
                    debug!(revision = outcome.publish.revision(), "Pass found document current");
                }
                None
            }
            Err(e) if e.is_retryable() => {
                let delay = backoff.record_failure();
                warn!(
                    error = %e,
                    kind = e.kind(),
                    failures = backoff.failures(),
                    delay_ms = delay.as_millis() as u64,
                    "Pass failed, requeueing"
                );
                Some(Instant::now() + delay)
            }
            Err(e) => {
                // Needs a declaration change; the resync interval retries it.
                backoff.reset();
                error!(error = %e, kind = e.kind(), "Pass failed");
                None
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
