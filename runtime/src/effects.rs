//! Fire-and-forget execution of [`SideEffect`]s.
//!
//! Each effect runs in its own spawned task under a timeout. Failures and
//! timeouts are logged and counted; nothing is reported back to the operation
//! that produced the effect. A shared pending counter lets the server wait for
//! in-flight effects during shutdown.

use crate::metrics::SideEffectMetrics;
use complaint_desk_core::effect::SideEffect;
use complaint_desk_core::notification::NotificationEmitter;
use complaint_desk_core::realtime::RealtimeBroadcaster;
use complaint_desk_core::types::ComplaintId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from the dispatcher itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Shutdown gave up while effects were still running.
    #[error("Drain timeout: {0} side effects still running")]
    DrainTimeout(usize),
}

/// Guard that decrements the pending counter on drop, even if the task panics.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs side effects against the notification and realtime collaborators.
#[derive(Clone)]
pub struct EffectDispatcher {
    notifier: Arc<dyn NotificationEmitter>,
    broadcaster: Arc<dyn RealtimeBroadcaster>,
    timeout: Duration,
    pending: Arc<AtomicUsize>,
}

impl EffectDispatcher {
    /// Create a dispatcher. Each effect gets at most `timeout` to finish.
    #[must_use]
    pub fn new(
        notifier: Arc<dyn NotificationEmitter>,
        broadcaster: Arc<dyn RealtimeBroadcaster>,
        timeout: Duration,
    ) -> Self {
        Self {
            notifier,
            broadcaster,
            timeout,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of effects currently in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Spawn every effect and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, complaint_id: ComplaintId, effects: Vec<SideEffect>) {
        for effect in effects {
            self.spawn(complaint_id, effect);
        }
    }

    fn spawn(&self, complaint_id: ComplaintId, effect: SideEffect) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.pending));

        let notifier = Arc::clone(&self.notifier);
        let broadcaster = Arc::clone(&self.broadcaster);
        let timeout = self.timeout;
        let kind = effect.kind();
        SideEffectMetrics::record_dispatched(kind);

        tokio::spawn(async move {
            let _guard = guard;

            let outcome = match effect {
                SideEffect::Notify(notification) => {
                    tokio::time::timeout(timeout, notifier.enqueue(notification))
                        .await
                        .map(|r| r.map_err(|e| e.to_string()))
                },
                SideEffect::Broadcast(event) => {
                    tokio::time::timeout(timeout, broadcaster.publish(event))
                        .await
                        .map(|r| r.map_err(|e| e.to_string()))
                },
            };

            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(complaint_id = %complaint_id, kind, "Side effect completed");
                },
                Ok(Err(error)) => {
                    tracing::warn!(complaint_id = %complaint_id, kind, error = %error, "Side effect failed");
                    SideEffectMetrics::record_failure(kind);
                },
                Err(_) => {
                    tracing::warn!(
                        complaint_id = %complaint_id,
                        kind,
                        timeout_ms = timeout.as_millis(),
                        "Side effect timed out"
                    );
                    SideEffectMetrics::record_timeout(kind);
                },
            }
        });
    }

    /// Wait until no effects are in flight.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DrainTimeout`] if effects are still running
    /// after `timeout`.
    pub async fn drain(&self, timeout: Duration) -> Result<(), DispatchError> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            let pending = self.pending();
            if pending == 0 {
                tracing::info!("All side effects completed");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(pending_effects = pending, "Drain timeout with side effects still running");
                return Err(DispatchError::DrainTimeout(pending));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl std::fmt::Debug for EffectDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectDispatcher")
            .field("timeout", &self.timeout)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
