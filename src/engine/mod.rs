//! The client synchronization engine.
//!
//! [`Engine`] owns every piece of client state: the catalog cache, the
//! selection, the last count results with their loading flag and error
//! slot, the history ring, and the language preference. Callers mutate it
//! only through the methods below and learn about changes from
//! [`EngineEvent`]s. History, language, and the active category are mirrored
//! to the [`PersistedStore`] after every change and rehydrated on start.

mod orchestrator;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::{CountApi, CountResult, HttpApi, PricingInfo};
use crate::catalog::{CatalogCache, CatalogCategory, Category, ModelCatalog};
use crate::channel::{
    ChannelObserver, ChannelSettings, ClientMessage, ConnectionState, Connector, PushChannel,
    WsConnector,
};
use crate::config::Config;
use crate::constants::{EVENT_CAPACITY, MIN_MODEL_NAME_LEN};
use crate::error::{ClientError, ValidationError};
use crate::events::EngineEvent;
use crate::history::{HistoryEntry, HistoryRing};
use crate::selection::Selection;
use crate::store::{Language, PersistedState, PersistedStore};

/// Read-only view of the last count operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountView {
    pub results: Vec<CountResult>,
    pub loading: bool,
    pub error: Option<ClientError>,
}

#[derive(Default)]
struct EngineState {
    catalog: CatalogCache,
    selection: Selection,
    count: CountView,
    /// Bumped by every count that passes validation.
    generation: u64,
    history: HistoryRing,
    language: Language,
}

impl EngineState {
    fn persisted(&self) -> PersistedState {
        PersistedState {
            history: self.history.entries().to_vec(),
            language: self.language,
            model_type: self.selection.category(),
        }
    }
}

struct Shared {
    state: Mutex<EngineState>,
    events: broadcast::Sender<EngineEvent>,
    store: PersistedStore,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: EngineEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn apply_snapshot(&self, snapshot: ModelCatalog) {
        let (changed, version) = {
            let mut state = self.lock();
            let changed = state.catalog.apply_snapshot(snapshot);
            (changed, state.catalog.version())
        };
        if changed {
            debug!(version, "catalog updated");
            self.emit(EngineEvent::CatalogChanged { version });
        }
    }
}

impl ChannelObserver for Shared {
    fn on_snapshot(&self, catalog: ModelCatalog) {
        self.apply_snapshot(catalog);
    }

    fn on_connection(&self, connection: ConnectionState) {
        self.emit(EngineEvent::ConnectionChanged(connection));
    }
}

/// Handle to a running engine. Clones share the same state.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
    api: Arc<dyn CountApi>,
    channel: PushChannel,
}

impl Engine {
    /// Rehydrates persisted state, then wires the API and push channel.
    ///
    /// The channel is not opened; call [`Engine::connect`].
    pub async fn start(
        api: Arc<dyn CountApi>,
        connector: Arc<dyn Connector>,
        store: PersistedStore,
        settings: ChannelSettings,
    ) -> Result<Self> {
        let persisted = store.load().await?.unwrap_or_default();
        info!(
            path = %store.path().display(),
            entries = persisted.history.len(),
            language = persisted.language.as_str(),
            category = %persisted.model_type,
            "engine state rehydrated"
        );

        let state = EngineState {
            selection: Selection::new(persisted.model_type),
            history: HistoryRing::from_entries(persisted.history),
            language: persisted.language,
            ..EngineState::default()
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            events,
            store,
        });
        let channel = PushChannel::new(settings, connector, shared.clone());
        Ok(Self {
            shared,
            api,
            channel,
        })
    }

    /// Builds the production engine: reqwest API, WebSocket channel, and the
    /// state file under the XDG data directory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let api = Arc::new(HttpApi::from_config(config)?);
        let settings = ChannelSettings::from_config(config)?;
        let store = PersistedStore::open(PersistedStore::default_path()?);
        Self::start(api, Arc::new(WsConnector), store, settings).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.shared.lock()
    }

    fn emit(&self, event: EngineEvent) {
        self.shared.emit(event);
    }

    fn persist(&self) {
        let snapshot = self.lock().persisted();
        self.shared.store.save(snapshot);
    }

    /// Waits for queued state writes to reach disk.
    pub async fn flush(&self) {
        self.shared.store.flush().await;
    }

    // --- catalog ---

    pub fn catalog(&self) -> ModelCatalog {
        self.lock().catalog.snapshot()
    }

    /// Cached models of `category`; empty if the catalog never arrived.
    pub fn get_current_models(&self, category: Category) -> Vec<String> {
        self.lock().catalog.get_current_models(category).to_vec()
    }

    /// Cached models of the active category.
    pub fn current_models(&self) -> Vec<String> {
        self.get_current_models(self.category())
    }

    /// Replaces the cached catalog with a snapshot from any source.
    pub fn apply_snapshot(&self, snapshot: ModelCatalog) {
        self.shared.apply_snapshot(snapshot);
    }

    /// Fetches the catalog over the request API and caches it.
    ///
    /// Failures are returned but do not touch the counting error slot.
    pub async fn refresh_catalog(&self) -> Result<ModelCatalog, ClientError> {
        match self.api.fetch_models().await {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot);
                Ok(self.catalog())
            }
            Err(e) => {
                warn!(error = %e, "catalog fetch failed");
                Err(e)
            }
        }
    }

    /// Fetches the catalog, then opens the push channel if `auto_connect`.
    ///
    /// A catalog outage is tolerated; the channel's `init` snapshot fills the
    /// cache once it connects.
    pub async fn bootstrap(&self, auto_connect: bool) {
        if self.refresh_catalog().await.is_err() {
            debug!("starting with an empty catalog");
        }
        if auto_connect {
            self.connect();
        }
    }

    /// Adds a model through the request API and caches the returned catalog.
    pub async fn register_model(
        &self,
        name: &str,
        category: CatalogCategory,
    ) -> Result<ModelCatalog, ClientError> {
        let name = name.trim();
        if name.chars().count() < MIN_MODEL_NAME_LEN {
            return Err(ValidationError::InvalidModelName.into());
        }
        let snapshot = self.api.add_model(name, category).await?;
        self.apply_snapshot(snapshot);
        Ok(self.catalog())
    }

    pub async fn pricing(&self, model: &str) -> Result<PricingInfo, ClientError> {
        self.api.pricing(model).await
    }

    // --- selection ---

    pub fn selection(&self) -> Selection {
        self.lock().selection.clone()
    }

    pub fn category(&self) -> Category {
        self.lock().selection.category()
    }

    /// Switches the active category and empties the selection.
    pub fn set_category(&self, category: Category) {
        self.lock().selection.set_category(category);
        self.persist();
        self.emit(EngineEvent::SelectionChanged);
    }

    /// Adds or removes `name`; returns whether it is selected afterwards.
    pub fn toggle_model(&self, name: &str) -> bool {
        let selected = self.lock().selection.toggle_model(name);
        self.emit(EngineEvent::SelectionChanged);
        selected
    }

    /// Replaces the selection. Names need not be in the catalog.
    pub fn set_selected_models<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.lock().selection.set_selected_models(names);
        self.emit(EngineEvent::SelectionChanged);
    }

    /// Selects every cached model of the active category matching `filter`.
    pub fn select_all_filtered(&self, filter: &str) -> usize {
        let added = {
            let mut state = self.lock();
            let category = state.selection.category();
            let available = state.catalog.get_current_models(category).to_vec();
            state.selection.select_all_filtered(&available, filter)
        };
        if added > 0 {
            self.emit(EngineEvent::SelectionChanged);
        }
        added
    }

    pub fn clear_selection(&self) {
        self.lock().selection.clear_all();
        self.emit(EngineEvent::SelectionChanged);
    }

    // --- results & history ---

    pub fn count_view(&self) -> CountView {
        self.lock().count.clone()
    }

    /// Entries, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.entries().to_vec()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
        self.persist();
        self.emit(EngineEvent::HistoryChanged);
    }

    // --- language ---

    pub fn language(&self) -> Language {
        self.lock().language
    }

    pub fn set_language(&self, language: Language) {
        self.lock().language = language;
        self.persist();
        self.emit(EngineEvent::LanguageChanged(language));
    }

    // --- push channel ---

    pub fn connection(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn connect(&self) {
        self.channel.connect();
    }

    pub fn reconnect(&self) {
        self.channel.reconnect();
    }

    pub fn disconnect(&self) {
        self.channel.disconnect();
    }

    pub fn send_message(&self, message: &ClientMessage) {
        self.channel.send_message(message);
    }

    /// Asks the catalog service to add a model over the push channel.
    ///
    /// Fire-and-forget: dropped when the channel is not open. The updated
    /// catalog arrives later as a `model_added` broadcast.
    pub fn add_model(&self, name: &str, category: CatalogCategory) {
        self.send_message(&ClientMessage::AddModel {
            name: name.trim().to_string(),
            category,
        });
    }
}
