use std::time::Duration;

use crate::error::SyncError;

/// Contract defaults. Kept as named constants so tests and the config
/// layer agree on the numbers.
pub const DEFAULT_TOPIC: &str = "orders";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(4000);
pub const DEFAULT_LIVENESS_FACTOR: u32 = 2;
pub const DEFAULT_RECENT_CAPACITY: usize = 6;
pub const DEFAULT_FEED_CAPACITY: usize = 8;

/// Tunable parameters of the synchronization core.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Push channel endpoint (`ws://` or `wss://`).
    pub endpoint: String,
    /// Topic carrying order change notifications.
    pub topic: String,
    /// Fixed delay between reconnect attempts. Deliberately constant:
    /// the retry cadence is an observable contract, capped in count only
    /// by `stop`.
    pub reconnect_delay: Duration,
    /// Outbound Ping cadence on a connected channel.
    pub heartbeat_interval: Duration,
    /// Inbound silence tolerated before the channel counts as dead,
    /// as a multiple of the heartbeat interval.
    pub liveness_factor: u32,
    /// Capacity of the recent-orders view.
    pub recent_capacity: usize,
    /// Capacity of the activity feed.
    pub feed_capacity: usize,
    /// Page size requested from the snapshot source.
    pub snapshot_page_size: usize,
}

impl SyncConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            topic: DEFAULT_TOPIC.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            liveness_factor: DEFAULT_LIVENESS_FACTOR,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            snapshot_page_size: DEFAULT_RECENT_CAPACITY,
        }
    }

    /// How long the channel may stay silent before it counts as dead.
    pub fn liveness_timeout(&self) -> Duration {
        self.heartbeat_interval * self.liveness_factor.max(1)
    }

    /// Structural checks, done once at start so misconfiguration fails the
    /// call instead of the retry loop.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.endpoint.starts_with("ws://") && !self.endpoint.starts_with("wss://") {
            return Err(SyncError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: "scheme must be ws:// or wss://".to_string(),
            });
        }
        if self.topic.is_empty() {
            return Err(SyncError::Config("topic must not be empty".to_string()));
        }
        if self.recent_capacity == 0 || self.feed_capacity == 0 {
            return Err(SyncError::Config(
                "view capacities must be at least 1".to_string(),
            ));
        }
        if self.snapshot_page_size == 0 {
            return Err(SyncError::Config(
                "snapshot page size must be at least 1".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(SyncError::Config(
                "heartbeat interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
