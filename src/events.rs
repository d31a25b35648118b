//! Change notifications emitted by the engine.
//!
//! Consumers subscribe with [`crate::engine::Engine::subscribe`] and re-read
//! the slice named by the event. Events carry no payload beyond what is
//! needed to decide whether to re-render.

use crate::channel::ConnectionState;
use crate::store::Language;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The cached catalog changed; carries the cache version afterwards.
    CatalogChanged { version: u64 },
    /// Active category or selected models changed.
    SelectionChanged,
    /// Results, the loading flag, or the error slot changed.
    CountChanged,
    HistoryChanged,
    LanguageChanged(Language),
    ConnectionChanged(ConnectionState),
}
