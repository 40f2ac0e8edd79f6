//! Topic subscription registry
//!
//! Maps topic names to decode-and-deliver handlers. The connection
//! manager reads `topics()` to re-announce every subscription after a
//! reconnect and feeds inbound events through `dispatch`.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{IssueSink, SyncIssue};

/// Decode-and-deliver callback for one topic. Returning `Err` means the
/// payload was malformed; the registry reports it and drops the message.
pub type TopicHandler =
    Box<dyn Fn(serde_json::Value) -> Result<(), serde_json::Error> + Send + Sync>;

#[derive(Default)]
pub struct SubscriptionRegistry {
    topics: Mutex<HashMap<String, Vec<TopicHandler>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Delivery is only effective while the channel is
    /// connected; topics registered mid-session are announced at the next
    /// (re)connect.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F)
    where
        F: Fn(serde_json::Value) -> Result<(), serde_json::Error> + Send + Sync + 'static,
    {
        let mut topics = self.topics.lock().unwrap();
        topics
            .entry(topic.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Remove every handler bound to a topic.
    pub fn unsubscribe(&self, topic: &str) {
        self.topics.lock().unwrap().remove(topic);
    }

    /// Registered topic names, sorted for a deterministic re-subscribe order.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Deliver one event payload to the topic's handlers. Decode failures
    /// are reported per handler and never stall the channel or other
    /// topics.
    pub(crate) fn dispatch(&self, topic: &str, payload: serde_json::Value, sink: &IssueSink) {
        let topics = self.topics.lock().unwrap();
        let Some(handlers) = topics.get(topic) else {
            debug!("no subscribers for topic `{}`, dropping event", topic);
            return;
        };
        for handler in handlers {
            if let Err(err) = handler(payload.clone()) {
                sink.report(SyncIssue::Decode {
                    topic: topic.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_reaches_only_the_matching_topic() {
        let registry = SubscriptionRegistry::new();
        let sink = IssueSink::new();
        let orders = Arc::new(AtomicUsize::new(0));
        let inventory = Arc::new(AtomicUsize::new(0));

        let counter = orders.clone();
        registry.subscribe("orders", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let counter = inventory.clone();
        registry.subscribe("inventory", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch("orders", serde_json::json!({"id": 1}), &sink);
        assert_eq!(orders.load(Ordering::SeqCst), 1);
        assert_eq!(inventory.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn decode_failure_is_reported_and_other_handlers_still_run() {
        let registry = SubscriptionRegistry::new();
        let sink = IssueSink::new();
        let mut issues = sink.subscribe();
        let delivered = Arc::new(AtomicUsize::new(0));

        registry.subscribe("orders", |payload| {
            // Force a decode failure by expecting the wrong shape.
            serde_json::from_value::<Vec<i64>>(payload).map(|_| ())
        });
        let counter = delivered.clone();
        registry.subscribe("orders", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.dispatch("orders", serde_json::json!({"id": 1}), &sink);

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        match issues.try_recv().unwrap() {
            SyncIssue::Decode { topic, .. } => assert_eq!(topic, "orders"),
            other => panic!("unexpected issue: {other:?}"),
        }
    }

    #[test]
    fn dispatch_to_unknown_topic_is_a_silent_drop() {
        let registry = SubscriptionRegistry::new();
        let sink = IssueSink::new();
        let mut issues = sink.subscribe();
        registry.dispatch("nobody-home", serde_json::json!({}), &sink);
        assert!(issues.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_removes_the_binding() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe("orders", |_| Ok(()));
        registry.subscribe("inventory", |_| Ok(()));
        assert_eq!(registry.topics(), vec!["inventory", "orders"]);

        registry.unsubscribe("orders");
        assert_eq!(registry.topics(), vec!["inventory"]);
    }
}
