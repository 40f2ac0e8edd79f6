//! The assembled synchronization core
//!
//! Wires the connection manager, subscription registry, reconciliation
//! engine and refresh coalescer into one explicitly owned instance with an
//! explicit teardown. Nothing in here is process-global: two `LiveSync`
//! instances (say, one per test) cannot interfere.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use order_api::{OrderAnalytics, OrderSummary};

use crate::coalesce::{self, RefreshHandle, SnapshotSource};
use crate::config::SyncConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{IssueSink, SyncError, SyncIssue};
use crate::reconcile::{ActivityEntry, PushEvent, Reconciler};
use crate::subscriptions::SubscriptionRegistry;

/// The live synchronization core, fully wired.
///
/// Consumers get: the connection state as an observable value, the two
/// views and analytics as cloned read-only snapshots, an issue stream, and
/// a manual refresh trigger. There are no other mutation entry points.
pub struct LiveSync {
    connection: ConnectionManager,
    reconciler: Arc<Reconciler>,
    refresh: RefreshHandle,
    sink: IssueSink,
    shutdown: CancellationToken,
}

impl LiveSync {
    /// Wire the core against a snapshot source and begin connecting.
    ///
    /// Fails fast on configuration problems only; everything else is
    /// recovered internally and reported on the issue stream. One initial
    /// refresh is armed so the views populate without waiting for the
    /// first push event.
    pub fn start<S: SnapshotSource>(config: SyncConfig, source: S) -> Result<Self, SyncError> {
        config.validate()?;

        let sink = IssueSink::new();
        let shutdown = CancellationToken::new();

        let (refresh, pending) = coalesce::channel();
        let reconciler = Arc::new(Reconciler::new(
            config.recent_capacity,
            config.feed_capacity,
            refresh.clone(),
        ));
        coalesce::spawn(
            source,
            reconciler.clone(),
            sink.clone(),
            config.snapshot_page_size,
            shutdown.child_token(),
            pending,
        );

        let registry = Arc::new(SubscriptionRegistry::new());
        {
            let reconciler = reconciler.clone();
            registry.subscribe(config.topic.as_str(), move |payload| {
                let order: OrderSummary = serde_json::from_value(payload)?;
                reconciler.apply_event(PushEvent::received_now(order));
                Ok(())
            });
        }

        let connection = ConnectionManager::start(config, registry, sink.clone())?;

        refresh.request_refresh();

        Ok(Self {
            connection,
            reconciler,
            refresh,
            sink,
            shutdown,
        })
    }

    /// Observable connection state.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.state()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.connection.current_state()
    }

    /// Read-only snapshot of the recent-orders view, newest first.
    pub fn recent_orders(&self) -> Vec<OrderSummary> {
        self.reconciler.recent_orders()
    }

    /// Read-only snapshot of the activity feed, newest first.
    pub fn activity_feed(&self) -> Vec<ActivityEntry> {
        self.reconciler.activity_feed()
    }

    /// Latest aggregate figures, if a snapshot has landed yet.
    pub fn analytics(&self) -> Option<OrderAnalytics> {
        self.reconciler.analytics()
    }

    /// Most recent snapshot-fetch failure. Rendered views are kept as-is
    /// alongside it: stale data beats blank data.
    pub fn last_fetch_error(&self) -> Option<String> {
        self.reconciler.last_fetch_error()
    }

    /// Bumped on every view change; lets a renderer poll cheaply.
    pub fn revision(&self) -> u64 {
        self.reconciler.revision()
    }

    /// Stream of recoverable runtime issues (transport, decode, fetch).
    pub fn subscribe_issues(&self) -> broadcast::Receiver<SyncIssue> {
        self.sink.subscribe()
    }

    /// Manual refresh, same coalescing rules as event-driven refreshes.
    pub fn request_refresh(&self) {
        self.refresh.request_refresh();
    }

    /// Tear everything down: channel, reconnect timers, refresh worker.
    /// A snapshot fetch still in flight resolves into the void.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.connection.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotError;
    use crate::protocol::{ClientFrame, ServerFrame};
    use crate::test_support::sample_order;
    use futures_util::{SinkExt, StreamExt};
    use order_api::OrderStatus;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    struct FixedSource {
        calls: Arc<AtomicUsize>,
    }

    impl SnapshotSource for FixedSource {
        fn recent_orders(
            &self,
            _limit: usize,
        ) -> impl Future<Output = Result<Vec<OrderSummary>, SnapshotError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(vec![sample_order(900, OrderStatus::Delivered, "Grace")]) }
        }

        fn order_analytics(
            &self,
        ) -> impl Future<Output = Result<OrderAnalytics, SnapshotError>> + Send {
            async move {
                Ok(OrderAnalytics {
                    total_orders: 1,
                    total_revenue: 19.9,
                    orders_by_status: HashMap::new(),
                    revenue_by_status: HashMap::new(),
                    average_order_value: 19.9,
                })
            }
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    #[tokio::test]
    async fn events_and_snapshots_flow_into_the_views() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            // Wait for the subscription, then push one order update.
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let frame: ClientFrame = serde_json::from_str(&text).unwrap();
                        if matches!(frame, ClientFrame::Subscribe { .. }) {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => return,
                }
            }
            let order = sample_order(42, OrderStatus::Confirmed, "Ada");
            let event = ServerFrame::Event {
                topic: "orders".to_string(),
                payload: serde_json::to_value(&order).unwrap(),
            };
            ws.send(Message::Text(serde_json::to_string(&event).unwrap().into()))
                .await
                .unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = SyncConfig::new(format!("ws://{addr}"));
        config.reconnect_delay = Duration::from_millis(50);

        let sync = LiveSync::start(
            config,
            FixedSource {
                calls: calls.clone(),
            },
        )
        .unwrap();

        let mut state = sync.connection_state();
        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await
        .expect("never connected")
        .unwrap();

        // The pushed event lands in both views...
        wait_until(|| sync.activity_feed().iter().any(|e| e.order_id == 42)).await;
        // ...and triggers a coalesced refresh beyond the initial one, which
        // then rebuilds the recent view from the snapshot source.
        wait_until(|| calls.load(Ordering::SeqCst) >= 2).await;
        wait_until(|| sync.recent_orders().iter().any(|o| o.id == 900)).await;
        assert_eq!(sync.analytics().unwrap().total_orders, 1);
        assert!(sync.last_fetch_error().is_none());

        sync.stop().await;
        assert_eq!(sync.current_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn start_rejects_bad_configuration() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = LiveSync::start(
            SyncConfig::new("http://not-a-websocket"),
            FixedSource { calls },
        );
        assert!(matches!(result, Err(SyncError::InvalidEndpoint { .. })));
    }
}
