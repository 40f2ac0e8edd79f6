//! Push channel connection lifecycle
//!
//! Owns one persistent WebSocket to the push endpoint: connect, announce
//! subscriptions, heartbeat, detect silence, reconnect after a fixed
//! delay, tear down on `stop`. Every state transition is published on a
//! watch channel the instant it happens, so listeners never observe a
//! silent gap around Connected.

use std::fmt;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{IssueSink, SyncError, SyncIssue};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::subscriptions::SubscriptionRegistry;

/// Lifecycle state of the push channel. Owned by the connection manager;
/// everyone else only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connected session ended.
enum SessionEnd {
    /// `stop` was called; the driver must exit without reconnecting.
    Stopped,
    /// Transport fault; the driver reconnects after the fixed delay.
    Lost(String),
}

/// Owns the push channel. Construct with [`start`](Self::start), tear down
/// with [`stop`](Self::stop); instances are independent, so tests can run
/// several side by side.
pub struct ConnectionManager {
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Validate the endpoint and begin connection attempts.
    ///
    /// Only configuration problems fail this call. Transport problems are
    /// retried behind the scenes, indefinitely and at a fixed cadence,
    /// until [`stop`](Self::stop).
    pub fn start(
        config: SyncConfig,
        registry: Arc<SubscriptionRegistry>,
        sink: IssueSink,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        // Eager URL check so a bad endpoint fails here, not in the retry loop.
        config
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|err| SyncError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: err.to_string(),
            })?;

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let shutdown = CancellationToken::new();
        let driver = tokio::spawn(drive(
            config,
            registry,
            sink,
            state_tx.clone(),
            shutdown.clone(),
        ));

        Ok(Self {
            state_tx,
            shutdown,
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Watch receiver over the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Tear down deterministically: cancel pending reconnect timers and
    /// in-flight handshakes, close the socket, publish `Disconnected`.
    /// Terminal until a new `start`. Safe to call more than once.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let driver = self.driver.lock().unwrap().take();
        if let Some(driver) = driver {
            let _ = driver.await;
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // Belt over the async stop: a dropped manager must not keep
        // reconnecting in the background.
        self.shutdown.cancel();
    }
}

async fn drive(
    config: SyncConfig,
    registry: Arc<SubscriptionRegistry>,
    sink: IssueSink,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
) {
    let mut attempt: u64 = 0;
    loop {
        if shutdown.is_cancelled() {
            break;
        }
        attempt += 1;
        state_tx.send_replace(ConnectionState::Connecting);
        debug!("connecting to {} (attempt {})", config.endpoint, attempt);

        let connected = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = tokio_tungstenite::connect_async(config.endpoint.as_str()) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                info!("push channel connected: {}", config.endpoint);
                state_tx.send_replace(ConnectionState::Connected);
                match session(stream, &config, &registry, &sink, &shutdown).await {
                    SessionEnd::Stopped => break,
                    SessionEnd::Lost(reason) => {
                        sink.report(SyncIssue::Transport(reason));
                        state_tx.send_replace(ConnectionState::Reconnecting);
                    }
                }
            }
            Err(err) => {
                sink.report(SyncIssue::Transport(format!("handshake failed: {err}")));
                state_tx.send_replace(ConnectionState::Reconnecting);
            }
        }

        // Fixed delay, no backoff. Cancelled by stop.
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
    debug!("connection driver stopped");
}

/// Run one connected session until it ends. Announces every registered
/// topic first; the channel forgets subscriptions across reconnects.
async fn session(
    stream: WsStream,
    config: &SyncConfig,
    registry: &SubscriptionRegistry,
    sink: &IssueSink,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let (mut outbound, mut inbound) = stream.split();

    for topic in registry.topics() {
        let frame = ClientFrame::Subscribe {
            topic: topic.clone(),
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(err) => return SessionEnd::Lost(format!("encode subscribe failed: {err}")),
        };
        if let Err(err) = outbound.send(Message::Text(json.into())).await {
            return SessionEnd::Lost(format!("subscribe to `{topic}` failed: {err}"));
        }
        debug!("subscribed to topic `{}`", topic);
    }

    let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let liveness = config.liveness_timeout();
    let mut deadline = tokio::time::Instant::now() + liveness;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = outbound.send(Message::Close(None)).await;
                return SessionEnd::Stopped;
            }
            _ = heartbeat.tick() => {
                if let Err(err) = outbound.send(Message::Ping(Vec::new().into())).await {
                    return SessionEnd::Lost(format!("heartbeat send failed: {err}"));
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                return SessionEnd::Lost(format!(
                    "no traffic for {}ms, assuming dead peer",
                    liveness.as_millis()
                ));
            }
            frame = inbound.next() => {
                // Any inbound frame proves the peer is alive.
                deadline = tokio::time::Instant::now() + liveness;
                match frame {
                    None => return SessionEnd::Lost("channel closed".to_string()),
                    Some(Err(err)) => return SessionEnd::Lost(format!("read failed: {err}")),
                    Some(Ok(Message::Text(text))) => handle_frame(&text, registry, sink),
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(err) = outbound.send(Message::Pong(payload)).await {
                            return SessionEnd::Lost(format!("pong send failed: {err}"));
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        return SessionEnd::Lost("server closed the channel".to_string());
                    }
                    Some(Ok(other)) => {
                        debug!("ignoring unexpected {}-byte non-text frame", other.len());
                    }
                }
            }
        }
    }
}

/// Decode one text frame and route it. Malformed frames are reported and
/// dropped; they never take the channel down.
fn handle_frame(text: &str, registry: &SubscriptionRegistry, sink: &IssueSink) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Event { topic, payload }) => registry.dispatch(&topic, payload, sink),
        Ok(ServerFrame::Subscribed { topic }) => {
            debug!("subscription to `{}` acknowledged", topic);
        }
        Err(err) => sink.report(SyncIssue::MalformedFrame(err.to_string())),
    }
}
