//! Persisted slice of engine state.
//!
//! Only history, language, and the active model type survive restarts. They
//! are stored as one JSON document at `~/.local/share/toksync/state.json`.
//! Writes are queued to a single background task so they land in the order
//! the mutations happened; each write goes to a temp file that is renamed
//! over the previous one.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::catalog::Category;
use crate::config::Config;
use crate::history::HistoryEntry;

/// UI language preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Ko => Self::En,
            Self::En => Self::Ko,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ko" | "kor" => Ok(Self::Ko),
            "en" | "eng" => Ok(Self::En),
            other => Err(anyhow!("Unknown language: {other}. Supported: ko, en")),
        }
    }
}

/// The exact document written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub model_type: Category,
}

enum WriteCmd {
    Save(PersistedState),
    Flush(oneshot::Sender<()>),
}

/// Handle to the state file and its background writer.
#[derive(Clone)]
pub struct PersistedStore {
    path: PathBuf,
    tx: mpsc::UnboundedSender<WriteCmd>,
}

impl PersistedStore {
    /// Returns the default state file path (`~/.local/share/toksync/state.json`).
    pub fn default_path() -> Result<PathBuf> {
        Ok(Config::data_dir()?.join(crate::constants::STATE_FILENAME))
    }

    /// Opens the store at `path` and spawns its writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(writer_loop(path.clone(), rx));
        Self { path, tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the last saved state.
    ///
    /// Returns `Ok(None)` when nothing was saved yet or the file cannot be
    /// parsed; an unreadable document must not keep the engine from starting.
    pub async fn load(&self) -> Result<Option<PersistedState>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read state file {:?}", self.path))?;
        match serde_json::from_str::<PersistedState>(&contents) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unreadable state file"
                );
                Ok(None)
            }
        }
    }

    /// Queues `state` to be written. Never blocks.
    pub fn save(&self, state: PersistedState) {
        if self.tx.send(WriteCmd::Save(state)).is_err() {
            warn!("state writer has stopped; change not persisted");
        }
    }

    /// Waits until every previously queued write has been attempted.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriteCmd::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn writer_loop(path: PathBuf, mut rx: mpsc::UnboundedReceiver<WriteCmd>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WriteCmd::Save(state) => {
                if let Err(e) = write_atomic(&path, &state).await {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to persist state"
                    );
                } else {
                    debug!(
                        path = %path.display(),
                        entries = state.history.len(),
                        "state persisted"
                    );
                }
            }
            WriteCmd::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn write_atomic(path: &Path, state: &PersistedState) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create state directory")?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}
