//! Configuration types and path resolution for toksync.
//!
//! Toksync stores its settings as TOML at the platform's XDG config path
//! (e.g. `~/.config/toksync/config.toml` on Linux) and engine state under the
//! XDG data directory (`~/.local/share/toksync/`).

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Load config with precedence: environment > project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        config.apply_env_overrides();
        Ok(config)
    }
}
