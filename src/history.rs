//! Bounded, newest-first history of successful counts.
//!
//! Entries are immutable once created. Eviction is by insertion order: the
//! ring keeps the [`HISTORY_CAPACITY`] most recently appended entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{HISTORY_CAPACITY, HISTORY_PREVIEW_CHARS};

/// One past counting result, as shown in the history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub input: String,
    pub model: String,
    pub token_count: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates an entry with a fresh UUID v4 and the current time.
    pub fn new(input: impl Into<String>, model: impl Into<String>, token_count: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            input: input.into(),
            model: model.into(),
            token_count,
            timestamp: Utc::now(),
        }
    }
}

/// Shortens text input to a display preview.
///
/// Keeps the first [`HISTORY_PREVIEW_CHARS`] characters and appends `...`
/// when anything was cut.
pub fn preview(text: &str) -> String {
    if text.chars().count() > HISTORY_PREVIEW_CHARS {
        let truncated: String = text.chars().take(HISTORY_PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRing {
    entries: Vec<HistoryEntry>,
}

impl HistoryRing {
    /// Rebuilds a ring from persisted entries (already newest first).
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_CAPACITY);
        Self { entries }
    }

    /// Prepends `entry`, evicting the oldest entries beyond capacity.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}
