//! File loading, merging, and editing for toksync configuration.

use anyhow::{bail, Context, Result};
use std::fs;

use super::types::{default_api_path, default_server_url, ChannelConfig, Config, RequestConfig};

impl Config {
    /// Loads the global config from `~/.config/toksync/config.toml`.
    ///
    /// If no config file exists, creates one with the built-in defaults
    /// spelled out and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = format!(
                r#"server_url = "{}"
api_path = "{}"

[channel]
reconnect_delay_ms = {}
max_reconnect_attempts = {}
auto_connect = true

[request]
timeout_secs = {}
"#,
                default_server_url(),
                default_api_path(),
                crate::constants::RECONNECT_DELAY_MS,
                crate::constants::MAX_RECONNECT_ATTEMPTS,
                crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            );
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Look for toksync.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config at {:?}", candidate))?;
                return Ok(Some(config));
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            server_url: if project.server_url != default_server_url() {
                project.server_url
            } else {
                global.server_url
            },
            api_path: if project.api_path != default_api_path() {
                project.api_path
            } else {
                global.api_path
            },
            channel: ChannelConfig {
                reconnect_delay_ms: project
                    .channel
                    .reconnect_delay_ms
                    .or(global.channel.reconnect_delay_ms),
                max_reconnect_attempts: project
                    .channel
                    .max_reconnect_attempts
                    .or(global.channel.max_reconnect_attempts),
                auto_connect: project.channel.auto_connect.or(global.channel.auto_connect),
            },
            request: RequestConfig {
                timeout_secs: project.request.timeout_secs.or(global.request.timeout_secs),
            },
        }
    }

    /// Sets one scalar key and returns the updated config.
    ///
    /// Keys use dotted paths for nested tables (`channel.auto_connect`).
    pub fn with_value(mut self, key: &str, value: &str) -> Result<Self> {
        match key {
            "server_url" => self.server_url = value.trim_end_matches('/').to_string(),
            "api_path" => self.api_path = value.to_string(),
            "channel.reconnect_delay_ms" => {
                self.channel.reconnect_delay_ms =
                    Some(value.parse().context("expected an integer")?)
            }
            "channel.max_reconnect_attempts" => {
                self.channel.max_reconnect_attempts =
                    Some(value.parse().context("expected an integer")?)
            }
            "channel.auto_connect" => {
                self.channel.auto_connect = Some(value.parse().context("expected true or false")?)
            }
            "request.timeout_secs" => {
                self.request.timeout_secs = Some(value.parse().context("expected an integer")?)
            }
            other => bail!(
                "Unknown config key: {other}. Supported: server_url, api_path, \
channel.reconnect_delay_ms, channel.max_reconnect_attempts, channel.auto_connect, \
request.timeout_secs"
            ),
        }
        Ok(self)
    }

    /// Writes `key = value` into the global config file, keeping other keys.
    pub fn set_global(key: &str, value: &str) -> Result<Config> {
        let updated = Self::load_global()?.with_value(key, value)?;
        let path = Self::config_path()?;
        let toml_str = toml::to_string_pretty(&updated)?;
        fs::write(&path, toml_str)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(updated)
    }
}
