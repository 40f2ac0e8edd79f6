//! Trailing-coalesced snapshot refresh
//!
//! Aggregate figures cannot be derived from single push events, so every
//! event warrants a re-fetch from the source of truth. This module keeps
//! that cheap: at most one fetch is in flight at a time, and any number of
//! triggers arriving during a fetch collapse into exactly one follow-up
//! issued when it completes. A burst therefore always ends with one fetch
//! that saw the latest state, and the fetch rate is bounded regardless of
//! event rate.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use order_api::{OrderAnalytics, OrderSummary};

use crate::error::{IssueSink, SnapshotError, SyncIssue};
use crate::reconcile::Reconciler;

/// Read-only source of truth the views are periodically rebuilt from.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Newest-first page of recent orders.
    fn recent_orders(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<OrderSummary>, SnapshotError>> + Send;

    /// Aggregate figures derived server-side.
    fn order_analytics(
        &self,
    ) -> impl Future<Output = Result<OrderAnalytics, SnapshotError>> + Send;
}

/// Cheap cloneable refresh trigger. Never blocks, never queues more than
/// one pending fetch.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    trigger: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Arm a refresh. A full slot means a follow-up is already pending:
    /// the call coalesces into it instead of queueing.
    pub fn request_refresh(&self) {
        let _ = self.trigger.try_send(());
    }
}

/// The single-slot pending-refresh flag, consumed by the worker.
pub(crate) struct PendingRefresh {
    slot: mpsc::Receiver<()>,
}

#[cfg(test)]
impl PendingRefresh {
    /// Let tests observe triggers directly instead of running a worker.
    pub(crate) fn into_probe(self) -> mpsc::Receiver<()> {
        self.slot
    }
}

/// Create the trigger/flag pair. Split from [`spawn`] so the handle can be
/// wired into the reconciler before the worker exists.
pub(crate) fn channel() -> (RefreshHandle, PendingRefresh) {
    let (trigger, slot) = mpsc::channel(1);
    (RefreshHandle { trigger }, PendingRefresh { slot })
}

/// Spawn the refresh worker. It exits when the token is cancelled or every
/// trigger handle is gone.
pub(crate) fn spawn<S: SnapshotSource>(
    source: S,
    reconciler: Arc<Reconciler>,
    sink: IssueSink,
    page_size: usize,
    shutdown: CancellationToken,
    pending: PendingRefresh,
) {
    tokio::spawn(run(source, reconciler, sink, page_size, shutdown, pending));
}

async fn run<S: SnapshotSource>(
    source: S,
    reconciler: Arc<Reconciler>,
    sink: IssueSink,
    page_size: usize,
    shutdown: CancellationToken,
    mut pending: PendingRefresh,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            armed = pending.slot.recv() => {
                if armed.is_none() {
                    break;
                }
            }
        }

        // Page and aggregates together, mirroring the dashboard overview
        // load. The fetch is not force-cancelled on teardown; its result
        // is discarded below instead.
        let result = tokio::try_join!(source.recent_orders(page_size), source.order_analytics());

        if shutdown.is_cancelled() {
            debug!("discarding snapshot that resolved after teardown");
            break;
        }

        match result {
            Ok((orders, analytics)) => {
                reconciler.apply_snapshot(orders);
                reconciler.apply_analytics(analytics);
                reconciler.clear_fetch_error();
                debug!("snapshot refresh applied");
            }
            Err(err) => {
                // Transient by assumption: remember it for the UI, report
                // it, stay armable for the next trigger.
                reconciler.record_fetch_error(err.to_string());
                sink.report(SyncIssue::Fetch(err.to_string()));
            }
        }
    }
    debug!("refresh worker stopped");
}
