use tokio::sync::broadcast;
use tracing::warn;

/// Errors surfaced synchronously when starting the core. Everything that
/// can go wrong later is recovered internally and reported as a
/// [`SyncIssue`] instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("invalid sync configuration: {0}")]
    Config(String),
}

/// Recoverable runtime faults. Reported on the issue sink, never thrown
/// across the core boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncIssue {
    /// Handshake failure, heartbeat timeout or unexpected close. The
    /// connection manager is already reconnecting.
    #[error("transport: {0}")]
    Transport(String),
    /// A frame that is not valid protocol JSON. Dropped; channel stays open.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// A payload a topic handler could not decode. Dropped; other topics
    /// keep flowing.
    #[error("malformed payload on `{topic}`: {reason}")]
    Decode { topic: String, reason: String },
    /// A snapshot fetch failed. The refresh coalescer stays armable.
    #[error("snapshot fetch failed: {0}")]
    Fetch(String),
}

/// Error returned by a snapshot source fetch.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct SnapshotError {
    pub message: String,
}

impl SnapshotError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<order_api::ApiError> for SnapshotError {
    fn from(err: order_api::ApiError) -> Self {
        Self::new(err.to_string())
    }
}

/// Fan-out for runtime issues. Every report is also logged, so issues are
/// visible even with no subscriber attached.
#[derive(Debug, Clone)]
pub struct IssueSink {
    tx: broadcast::Sender<SyncIssue>,
}

impl IssueSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncIssue> {
        self.tx.subscribe()
    }

    pub fn report(&self, issue: SyncIssue) {
        warn!("{}", issue);
        // No receivers is fine; the log line above already happened.
        let _ = self.tx.send(issue);
    }
}

impl Default for IssueSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reported_issues_reach_subscribers() {
        let sink = IssueSink::new();
        let mut rx = sink.subscribe();
        sink.report(SyncIssue::Transport("connection reset".to_string()));
        match rx.recv().await.unwrap() {
            SyncIssue::Transport(reason) => assert_eq!(reason, "connection reset"),
            other => panic!("unexpected issue: {other:?}"),
        }
    }

    #[test]
    fn report_without_subscribers_does_not_panic() {
        let sink = IssueSink::new();
        sink.report(SyncIssue::Fetch("service unavailable".to_string()));
    }

    #[test]
    fn issue_display_names_the_topic() {
        let issue = SyncIssue::Decode {
            topic: "orders".to_string(),
            reason: "missing field `id`".to_string(),
        };
        let text = issue.to_string();
        assert!(text.contains("orders"));
        assert!(text.contains("missing field"));
    }
}
