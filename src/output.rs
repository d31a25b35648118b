//! Output rendering for toksync.
//!
//! Defines the [`Renderer`] trait that decouples engine state from the
//! display layer. [`StdoutRenderer`] prints colored text to the terminal.

use colored::Colorize;

use crate::engine::CountView;
use crate::error::ClientError;
use crate::events::EngineEvent;
use crate::format;
use crate::history::HistoryEntry;

/// Trait for rendering engine state.
pub trait Renderer {
    /// Render the outcome of a count: results, loading, or the error slot.
    fn render_count(&mut self, view: &CountView);

    fn render_history(&mut self, entries: &[HistoryEntry]);

    /// Called when an operation fails outside the counting flow.
    fn render_error(&mut self, err: &ClientError);

    fn render_event(&mut self, event: &EngineEvent);
}

/// Renders to stdout (errors to stderr).
#[derive(Default)]
pub struct StdoutRenderer;

impl StdoutRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for StdoutRenderer {
    fn render_count(&mut self, view: &CountView) {
        if view.loading {
            println!("{}", "counting...".dimmed());
        } else if let Some(err) = &view.error {
            self.render_error(err);
        } else if view.results.is_empty() {
            println!("{}", "no results".dimmed());
        } else {
            println!("{}", format::format_results(&view.results));
            let total: u64 = view.results.iter().map(|r| r.token_count).sum();
            if view.results.len() > 1 {
                let summary = format!(
                    "[{} tokens across {} models]",
                    format::format_count(total),
                    view.results.len()
                );
                println!("{}", summary.dimmed());
            }
        }
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        println!("{}", format::format_history(entries));
    }

    fn render_error(&mut self, err: &ClientError) {
        match err {
            ClientError::Api { status, .. } => {
                let status = format!("(HTTP {status})");
                eprintln!("{} {} {}", "error:".red().bold(), err, status.dimmed())
            }
            _ if err.is_validation() => eprintln!("{} {}", "?".yellow(), err),
            _ => eprintln!("{} {}", "error:".red().bold(), err),
        }
    }

    fn render_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::CatalogChanged { version } => {
                let updated = format!("updated to version {version}");
                println!("{} {}", "catalog".cyan().bold(), updated.dimmed());
            }
            EngineEvent::ConnectionChanged(state) => {
                let state = format::format_connection(state);
                println!("{} {}", "channel".cyan().bold(), state);
            }
            EngineEvent::LanguageChanged(language) => {
                println!("{} {}", "language".cyan().bold(), language.as_str());
            }
            // selection, results and history are printed by the command that changed them
            EngineEvent::SelectionChanged
            | EngineEvent::CountChanged
            | EngineEvent::HistoryChanged => {}
        }
    }
}
