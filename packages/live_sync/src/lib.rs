//! Live synchronization core for the order dashboard
//!
//! Maintains one persistent push channel to the order service, reconciles
//! asynchronously delivered change events against periodically fetched
//! aggregate snapshots, and exposes a consistent, bounded, duplicate-free
//! view of recent activity.
//!
//! The moving parts:
//!
//! - [`ConnectionManager`]: owns the WebSocket lifecycle: connect,
//!   heartbeat, detect silence, reconnect after a fixed delay, stop.
//! - [`SubscriptionRegistry`]: topic-to-handler bindings, re-announced on
//!   every reconnect (the channel forgets subscriptions).
//! - [`Reconciler`]: merges push events and snapshot fetches into the
//!   capped recent-orders and activity-feed views.
//! - Refresh coalescer: collapses bursts of refresh triggers into at most
//!   one in-flight snapshot fetch plus one trailing follow-up.
//! - [`LiveSync`]: the assembled core with explicit `start`/`stop`;
//!   multiple instances do not interfere.
//!
//! Delivery contract: at-least-once with idempotent merge. Duplicate
//! deliveries are invisible in the recent view and intentionally visible
//! in the activity feed. Nothing is persisted across restarts.

mod coalesce;
pub mod config;
mod connection;
mod error;
pub mod protocol;
mod reconcile;
mod service;
mod subscriptions;
#[cfg(test)]
mod test_support;

pub use coalesce::{RefreshHandle, SnapshotSource};
pub use config::SyncConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{IssueSink, SnapshotError, SyncError, SyncIssue};
pub use reconcile::{ActivityEntry, PushEvent, Reconciler};
pub use service::LiveSync;
pub use subscriptions::SubscriptionRegistry;
