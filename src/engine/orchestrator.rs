//! Count orchestration: one submission fanned out to every selected model.
//!
//! Results are all-or-nothing. Every request is awaited, and if any of them
//! fails the result set is emptied and the first failure (in selection
//! order) lands in the error slot. Only a fully successful round appends to
//! history. A newer submission supersedes an older one still in flight; the
//! older one's outcome never reaches the engine state.

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::Engine;
use crate::api::{CountRequest, CountResult};
use crate::catalog::Category;
use crate::error::{ClientError, ValidationError};
use crate::events::EngineEvent;
use crate::history::HistoryEntry;
use crate::input::{CountInput, CountPayload};

struct Submission {
    generation: u64,
    models: Vec<String>,
    category: Category,
    payload: CountPayload,
}

impl Engine {
    /// Counts `input` against every selected model.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without any network call when
    /// nothing is selected or the active input is empty, the first
    /// per-model failure when any request fails, and
    /// [`ClientError::Superseded`] when a newer count started meanwhile.
    pub async fn count_tokens(
        &self,
        input: &CountInput,
    ) -> Result<Vec<CountResult>, ClientError> {
        let submission = self.begin_count(input)?;
        info!(
            models = submission.models.len(),
            category = %submission.category,
            generation = submission.generation,
            "counting tokens"
        );

        let requests = submission.models.iter().map(|model| {
            self.api.count(CountRequest {
                payload: &submission.payload,
                model,
                category: submission.category,
            })
        });
        // join_all keeps input order regardless of completion order
        let outcomes = join_all(requests).await;

        self.finish_count(&submission, outcomes)
    }

    fn begin_count(&self, input: &CountInput) -> Result<Submission, ClientError> {
        let submission = {
            let mut state = self.lock();
            let validated = if state.selection.is_empty() {
                Err(ValidationError::NoModelSelected)
            } else {
                input.to_payload()
            };
            match validated {
                Ok(payload) => {
                    state.generation += 1;
                    state.count.loading = true;
                    state.count.error = None;
                    Ok(Submission {
                        generation: state.generation,
                        models: state.selection.models().to_vec(),
                        category: state.selection.category(),
                        payload,
                    })
                }
                Err(e) => {
                    debug!(error = %e, "count rejected before sending");
                    state.count.error = Some(e.clone().into());
                    Err(ClientError::from(e))
                }
            }
        };
        self.emit(EngineEvent::CountChanged);
        submission
    }

    fn finish_count(
        &self,
        submission: &Submission,
        outcomes: Vec<Result<CountResult, ClientError>>,
    ) -> Result<Vec<CountResult>, ClientError> {
        let mut state = self.lock();
        if state.generation != submission.generation {
            debug!(
                generation = submission.generation,
                current = state.generation,
                "discarding superseded count"
            );
            return Err(ClientError::Superseded);
        }
        state.count.loading = false;

        let results = match outcomes.into_iter().collect::<Result<Vec<_>, _>>() {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "count failed; results cleared");
                state.count.results.clear();
                state.count.error = Some(e.clone());
                drop(state);
                self.emit(EngineEvent::CountChanged);
                return Err(e);
            }
        };

        let preview = submission.payload.preview();
        for result in &results {
            state.history.append(HistoryEntry::new(
                preview.clone(),
                result.model.clone(),
                result.token_count,
            ));
        }
        state.count.results = results.clone();
        state.count.error = None;
        let persisted = state.persisted();
        drop(state);

        self.shared.store.save(persisted);
        self.emit(EngineEvent::CountChanged);
        self.emit(EngineEvent::HistoryChanged);
        Ok(results)
    }
}
