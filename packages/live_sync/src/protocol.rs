//! Push channel wire protocol
//!
//! JSON text frames, internally tagged. Heartbeats ride on WebSocket
//! Ping/Pong frames and never appear here.

use serde::{Deserialize, Serialize};

/// Frames sent from the client to the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Announce interest in a topic. The channel does not persist
    /// subscriptions, so this is re-sent after every reconnect.
    Subscribe { topic: String },
    /// Drop a topic subscription.
    Unsubscribe { topic: String },
}

/// Frames pushed from the channel to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// A topic event. The payload shape is the topic's business; handlers
    /// decode it and malformed payloads are dropped.
    Event {
        topic: String,
        payload: serde_json::Value,
    },
    /// Subscription acknowledgement.
    Subscribed { topic: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_serde() {
        let frame = ClientFrame::Subscribe {
            topic: "orders".to_string(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "Subscribe");
        assert_eq!(json["topic"], "orders");
        let rt: ClientFrame = serde_json::from_value(json).unwrap();
        match rt {
            ClientFrame::Subscribe { topic } => assert_eq!(topic, "orders"),
            other => panic!("expected Subscribe, got {other:?}"),
        }
    }

    #[test]
    fn unsubscribe_frame_serde() {
        let frame = ClientFrame::Unsubscribe {
            topic: "orders".to_string(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "Unsubscribe");
        assert_eq!(json["topic"], "orders");
    }

    #[test]
    fn event_frame_serde() {
        let frame = ServerFrame::Event {
            topic: "orders".to_string(),
            payload: serde_json::json!({"id": 7}),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "Event");
        assert_eq!(json["payload"]["id"], 7);
        let rt: ServerFrame = serde_json::from_value(json).unwrap();
        match rt {
            ServerFrame::Event { topic, payload } => {
                assert_eq!(topic, "orders");
                assert_eq!(payload["id"], 7);
            }
            other => panic!("expected Event, got {other:?}"),
        }
    }

    #[test]
    fn subscribed_frame_serde() {
        let frame = ServerFrame::Subscribed {
            topic: "orders".to_string(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        let rt: ServerFrame = serde_json::from_str(&json).unwrap();
        match rt {
            ServerFrame::Subscribed { topic } => assert_eq!(topic, "orders"),
            other => panic!("expected Subscribed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_frame_type_is_an_error() {
        let err = serde_json::from_str::<ServerFrame>(r#"{"type":"Nonsense"}"#);
        assert!(err.is_err());
    }
}
