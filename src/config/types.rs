//! Struct definitions and serde defaults for toksync configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for toksync, deserialized from `config.toml`.
///
/// Fields use serde defaults so toksync can run against a local service
/// when no config file exists.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Origin of the tokenizer service (e.g. `"http://localhost:7860"`).
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Path prefix of the request API below the origin.
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Push channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Request/response API settings.
    #[serde(default)]
    pub request: RequestConfig,
}

pub(super) fn default_server_url() -> String {
    crate::constants::DEFAULT_SERVER_URL.to_string()
}

pub(super) fn default_api_path() -> String {
    crate::constants::DEFAULT_API_PATH.to_string()
}

/// Reconnection behaviour of the push channel.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Fixed delay between automatic reconnection attempts.
    pub reconnect_delay_ms: Option<u64>,
    /// Automatic attempts before the channel stays disconnected.
    pub max_reconnect_attempts: Option<u32>,
    /// Open the channel as soon as the engine starts.
    pub auto_connect: Option<bool>,
}

/// Settings for the request/response API.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct RequestConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_path: default_api_path(),
            channel: ChannelConfig::default(),
            request: RequestConfig::default(),
        }
    }
}
