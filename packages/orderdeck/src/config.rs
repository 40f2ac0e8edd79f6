use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use live_sync::SyncConfig;
use live_sync::config::{
    DEFAULT_FEED_CAPACITY, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_LIVENESS_FACTOR,
    DEFAULT_RECENT_CAPACITY, DEFAULT_RECONNECT_DELAY, DEFAULT_TOPIC,
};

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Two equivalent ways to configure:
//
//   config.toml:     [channel]
//                    endpoint = "ws://localhost:8080/ws"
//
//   env var:         DECK_CHANNEL__ENDPOINT=ws://host/ws   (double underscore = nesting)
//
// (single underscore stays within field names: DECK_CHANNEL__RECONNECT_DELAY_MS)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiFileConfig,
    #[serde(default)]
    pub channel: ChannelFileConfig,
    #[serde(default)]
    pub views: ViewsFileConfig,
}

/// Order service REST settings (lives under `[api]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiFileConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for the order service. Acquiring one is the session
    /// provider's job; we only carry it.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ApiFileConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bearer_token: None,
        }
    }
}

/// Push channel settings (lives under `[channel]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelFileConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_liveness_factor")]
    pub liveness_factor: u32,
}

impl Default for ChannelFileConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            topic: default_topic(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            liveness_factor: default_liveness_factor(),
        }
    }
}

/// View bounds (lives under `[views]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewsFileConfig {
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    #[serde(default = "default_recent_capacity")]
    pub snapshot_page_size: usize,
}

impl Default for ViewsFileConfig {
    fn default() -> Self {
        Self {
            recent_capacity: default_recent_capacity(),
            feed_capacity: default_feed_capacity(),
            snapshot_page_size: default_recent_capacity(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_endpoint() -> String {
    "ws://localhost:8080/ws".to_string()
}
fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}
fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64
}
fn default_liveness_factor() -> u32 {
    DEFAULT_LIVENESS_FACTOR
}
fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}
fn default_feed_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

impl FileConfig {
    /// Runtime view for the sync core.
    pub fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new(self.channel.endpoint.clone());
        config.topic = self.channel.topic.clone();
        config.reconnect_delay = Duration::from_millis(self.channel.reconnect_delay_ms);
        config.heartbeat_interval = Duration::from_millis(self.channel.heartbeat_interval_ms);
        config.liveness_factor = self.channel.liveness_factor;
        config.recent_capacity = self.views.recent_capacity;
        config.feed_capacity = self.views.feed_capacity;
        config.snapshot_page_size = self.views.snapshot_page_size;
        config
    }
}

/// Build a figment that layers: defaults → config.toml → DECK_* env vars.
pub fn load_config(config_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join("config.toml")))
        .merge(Env::prefixed("DECK_").split("__"))
}
