//! Reconciliation engine
//!
//! Merges decoded push events and periodic snapshot fetches into the two
//! bounded dashboard views. The engine is the only writer; consumers get
//! cloned snapshots. Both views are updated atomically per event under a
//! single lock, so a reader never observes the recent view and the feed
//! mid-merge.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use order_api::{OrderAnalytics, OrderStatus, OrderSummary};

use crate::coalesce::RefreshHandle;

/// A decoded order notification stamped with its local receipt time.
/// Payload timestamps are never trusted for ordering.
#[derive(Debug, Clone)]
pub struct PushEvent {
    pub order: OrderSummary,
    pub received_at: DateTime<Utc>,
}

impl PushEvent {
    pub fn new(order: OrderSummary, received_at: DateTime<Utc>) -> Self {
        Self { order, received_at }
    }

    /// Stamp an order update with the current receipt time.
    pub fn received_now(order: OrderSummary) -> Self {
        Self::new(order, Utc::now())
    }
}

/// One row of the activity feed: what happened, when we saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub order_id: i64,
    pub status: OrderStatus,
    pub customer_name: String,
    pub recorded_at: DateTime<Utc>,
}

struct ViewState {
    recent: VecDeque<OrderSummary>,
    feed: VecDeque<ActivityEntry>,
    analytics: Option<OrderAnalytics>,
    last_fetch_error: Option<String>,
}

/// Owns the dashboard views and the analytics snapshot.
pub struct Reconciler {
    views: Mutex<ViewState>,
    revision: AtomicU64,
    recent_capacity: usize,
    feed_capacity: usize,
    refresh: RefreshHandle,
}

impl Reconciler {
    pub fn new(recent_capacity: usize, feed_capacity: usize, refresh: RefreshHandle) -> Self {
        Self {
            views: Mutex::new(ViewState {
                recent: VecDeque::with_capacity(recent_capacity),
                feed: VecDeque::with_capacity(feed_capacity),
                analytics: None,
                last_fetch_error: None,
            }),
            revision: AtomicU64::new(0),
            recent_capacity,
            feed_capacity,
            refresh,
        }
    }

    /// Merge one push event.
    ///
    /// Recent view: move-to-front upsert; an already-known order is
    /// relocated, never duplicated; the oldest entry past capacity is
    /// evicted. Feed: unconditionally one new row, so a duplicate delivery
    /// shows up twice by design (at-least-once, visible but harmless).
    /// Afterwards a snapshot refresh is armed: totals and revenue only
    /// exist server-side.
    pub fn apply_event(&self, event: PushEvent) {
        {
            let mut views = self.views.lock().unwrap();

            views.recent.retain(|order| order.id != event.order.id);
            views.recent.push_front(event.order.clone());
            views.recent.truncate(self.recent_capacity);

            views.feed.push_front(ActivityEntry {
                order_id: event.order.id,
                status: event.order.status,
                customer_name: event.order.customer_name.clone(),
                recorded_at: event.received_at,
            });
            views.feed.truncate(self.feed_capacity);
        }
        self.bump();
        self.refresh.request_refresh();
    }

    /// Replace the recent view wholesale with a fetched page, source order
    /// preserved (assumed newest-first). The feed records what happened
    /// and is never rewritten from a snapshot.
    ///
    /// A fetch that began before an event arrived may resolve after it and
    /// transiently rewind the recent view to pre-event data. That is an
    /// accepted race, not data loss: the event's own coalesced refresh
    /// converges the view on the next pass.
    pub fn apply_snapshot(&self, orders: Vec<OrderSummary>) {
        {
            let mut views = self.views.lock().unwrap();
            views.recent = orders.into_iter().take(self.recent_capacity).collect();
        }
        self.bump();
    }

    /// Replace the aggregate figures from a snapshot fetch.
    pub fn apply_analytics(&self, analytics: OrderAnalytics) {
        self.views.lock().unwrap().analytics = Some(analytics);
        self.bump();
    }

    /// Remember the most recent fetch failure for the UI. Rendered views
    /// stay as they are: stale data beats blank data.
    pub fn record_fetch_error(&self, message: impl Into<String>) {
        self.views.lock().unwrap().last_fetch_error = Some(message.into());
        self.bump();
    }

    pub fn clear_fetch_error(&self) {
        let mut views = self.views.lock().unwrap();
        if views.last_fetch_error.take().is_some() {
            drop(views);
            self.bump();
        }
    }

    pub fn recent_orders(&self) -> Vec<OrderSummary> {
        self.views.lock().unwrap().recent.iter().cloned().collect()
    }

    pub fn activity_feed(&self) -> Vec<ActivityEntry> {
        self.views.lock().unwrap().feed.iter().cloned().collect()
    }

    pub fn analytics(&self) -> Option<OrderAnalytics> {
        self.views.lock().unwrap().analytics.clone()
    }

    pub fn last_fetch_error(&self) -> Option<String> {
        self.views.lock().unwrap().last_fetch_error.clone()
    }

    /// Bumped on every view mutation; cheap change detection for pollers.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::Release);
    }
}
