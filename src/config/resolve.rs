//! Environment variable substitution, defaults, and endpoint derivation.

use std::time::Duration;

use super::types::Config;
use crate::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_MS, SERVER_URL_ENV,
    WS_PATH,
};
use crate::error::ChannelError;

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.server_url = Self::resolve_str(&self.server_url);
        self.api_path = Self::resolve_str(&self.api_path);
    }

    /// `TOKSYNC_SERVER_URL` wins over every file.
    pub(super) fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    ///
    /// Substituted values are not scanned again.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        let mut from = 0;
        while let Some(offset) = result[from..].find("{env:") {
            let start = from + offset;
            let Some(end) = result[start..].find('}') else {
                break;
            };
            let var_name = &result[start + 5..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
            from = start + value.len();
        }
        result
    }

    /// Base URL of the request API, e.g. `http://localhost:7860/api`.
    pub fn api_base(&self) -> String {
        format!(
            "{}{}",
            self.server_url.trim_end_matches('/'),
            normalized_path(&self.api_path)
        )
    }

    /// Push channel endpoint on the same origin, with the scheme upgraded
    /// (`http` to `ws`, `https` to `wss`).
    pub fn ws_url(&self) -> Result<String, ChannelError> {
        let origin = self.server_url.trim_end_matches('/');
        let upgraded = if let Some(rest) = origin.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = origin.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(ChannelError::InvalidEndpoint(self.server_url.clone()));
        };
        let path = normalized_path(&self.api_path);
        Ok(format!("{upgraded}{path}{WS_PATH}"))
    }

    /// Delay before each automatic reconnection attempt.
    pub fn reconnect_delay(&self) -> Duration {
        let ms = self.channel.reconnect_delay_ms;
        Duration::from_millis(ms.unwrap_or(RECONNECT_DELAY_MS))
    }

    /// Automatic reconnection attempts before giving up.
    pub fn max_reconnect_attempts(&self) -> u32 {
        self.channel
            .max_reconnect_attempts
            .unwrap_or(MAX_RECONNECT_ATTEMPTS)
    }

    pub fn auto_connect(&self) -> bool {
        self.channel.auto_connect.unwrap_or(true)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request
                .timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// `""` stays empty; anything else gets exactly one leading slash and no
/// trailing one.
fn normalized_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
