//! Session Controller
//!
//! Tracks where the operator is in the active dataset, routes span
//! submissions into the accumulator and commits exactly one record per item
//! before moving on.
//!
//! Per loaded dataset the session is either `AwaitingItem` (an item is on
//! screen, spans may be pending) or `Completed` (position ran past the last
//! item). `Completed` is absorbing until another dataset is loaded.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotation::{Accumulator, Classification};
use crate::dataset::Dataset;
use crate::models::{
    AnnotationRecord, ErrorCategory, ErrorSpan, ItemId, Rater, ScoreRecord, Severity, SpanSet,
    TranslationItem, MAX_SCORE,
};
use crate::taxonomy;
use crate::writer::RecordSink;
use crate::{Error, Result};

/// Session phase for the loaded dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    AwaitingItem,
    Completed,
}

/// Everything that belongs to one loaded dataset
#[derive(Debug)]
struct SessionState {
    dataset: Dataset,
    position: usize,
    pending: Accumulator,
    phase: SessionPhase,
}

impl SessionState {
    /// Sessions walk rows in file order, starting at row 0
    fn start(dataset: Dataset) -> Self {
        let position = 0;
        let phase = if dataset.is_empty() {
            SessionPhase::Completed
        } else {
            SessionPhase::AwaitingItem
        };
        Self {
            dataset,
            position,
            pending: Accumulator::new(),
            phase,
        }
    }

    fn require_item(&self) -> Result<&TranslationItem> {
        match self.phase {
            SessionPhase::Completed => Err(Error::InvalidState(format!(
                "Reached the end of {} (position {} of {})",
                self.dataset.name(),
                self.position,
                self.dataset.len()
            ))),
            SessionPhase::AwaitingItem => self.dataset.item_at(self.position),
        }
    }
}

/// Result of a successful advance
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    /// Record that was appended to the annotation store
    pub record: AnnotationRecord,
    /// Position after the advance
    pub position: usize,
    pub phase: SessionPhase,
    /// Set when the secondary score file could not be written
    pub score_warning: Option<String>,
}

/// Serializable snapshot handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub dataset: Option<String>,
    pub total: usize,
    pub position: usize,
    pub phase: Option<SessionPhase>,
    pub item: Option<TranslationItem>,
    pub classification: Classification,
    pub pending: SpanSet,
}

/// Explicit command handlers over the annotation session
pub struct SessionController {
    state: Option<SessionState>,
    sink: Box<dyn RecordSink + Send>,
}

impl SessionController {
    /// Create an idle controller; nothing can happen until a dataset loads
    pub fn new(sink: Box<dyn RecordSink + Send>) -> Self {
        Self { state: None, sink }
    }

    /// Load a dataset and start over at its first item
    ///
    /// On failure the previous session (if any) stays exactly as it was.
    pub fn load_dataset(&mut self, path: &Path) -> Result<()> {
        let dataset = Dataset::load(path)?;

        if let Some(previous) = &self.state {
            if !previous.pending.is_empty() {
                warn!(
                    dataset = %previous.dataset.name(),
                    position = previous.position,
                    discarded = previous.pending.len(),
                    "Discarding uncommitted annotations on dataset switch"
                );
            }
        }

        let state = SessionState::start(dataset);
        info!(
            dataset = %state.dataset.name(),
            items = state.dataset.len(),
            position = state.position,
            "Session started"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Move to the item carrying `id`
    ///
    /// Pending spans are kept; they will be committed with whichever item
    /// is on screen at the next advance.
    pub fn jump_to_id(&mut self, id: &ItemId) -> Result<usize> {
        let state = self.state_mut()?;
        state.require_item()?;

        let position = state.dataset.position_for_id(id)?;
        if !state.pending.is_empty() {
            warn!(
                from = state.position,
                to = position,
                pending = state.pending.len(),
                "Jumping with uncommitted annotations"
            );
        }
        state.position = position;
        info!(id = %id, position, "Jumped to item");
        Ok(position)
    }

    /// Validate and add one error span against the current item
    pub fn record_span(
        &mut self,
        span_text: &str,
        severity: Severity,
        category: ErrorCategory,
        correction: Option<String>,
    ) -> Result<ErrorSpan> {
        let category = taxonomy::validate(category)?;
        let state = self.state_mut()?;
        let target = state.require_item()?.target.clone();

        let span = state
            .pending
            .add_span(&target, span_text, severity, category, correction)?
            .clone();
        debug!(
            position = state.position,
            start = span.start,
            end = span.end,
            category = %span.category.label(),
            severity = %span.severity,
            "Recorded error span"
        );
        Ok(span)
    }

    /// Classify the current item as free of errors
    pub fn mark_all_correct(&mut self) -> Result<()> {
        let state = self.state_mut()?;
        state.require_item()?;
        state.pending.mark_all_correct()?;
        debug!(position = state.position, "Item marked correct");
        Ok(())
    }

    /// Classify the current item as unusable
    pub fn mark_unusable(&mut self) -> Result<()> {
        let state = self.state_mut()?;
        state.require_item()?;
        state.pending.mark_too_many_errors()?;
        debug!(position = state.position, "Item marked unusable");
        Ok(())
    }

    /// Commit the current item with `score` and move to the next one
    ///
    /// The annotation append is the commit point: if it fails nothing
    /// changes and the operator can simply retry.
    pub fn advance(&mut self, score: u32, rater: Rater) -> Result<AdvanceOutcome> {
        if score > MAX_SCORE {
            return Err(Error::InvalidInput(format!(
                "Score {} outside 0-{}",
                score, MAX_SCORE
            )));
        }

        let state = self.state.as_mut().ok_or(Error::NoDataset)?;
        let item = state.require_item()?;

        let record = AnnotationRecord::new(
            state.dataset.name(),
            state.position,
            item,
            rater,
            score as u8,
            state.pending.contents().clone(),
        );

        self.sink
            .append_annotation(&state.dataset, &record)
            .map_err(|e| match e {
                Error::Persistence(_) => e,
                other => Error::persistence(other),
            })?;

        let score_warning = match self
            .sink
            .append_score(&state.dataset, &ScoreRecord::from(&record))
        {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    dataset = %state.dataset.name(),
                    position = state.position,
                    error = %e,
                    "Score file append failed after annotation was committed"
                );
                Some(e.to_string())
            }
        };

        state.pending.reset();
        state.position += 1;
        if state.position >= state.dataset.len() {
            state.phase = SessionPhase::Completed;
            info!(dataset = %state.dataset.name(), "Reached end of dataset");
        }

        info!(
            dataset = %state.dataset.name(),
            record_id = %record.record_id,
            rater = %record.rater,
            score = record.score,
            verdict = record.annotation.verdict(),
            position = state.position,
            "Committed annotation"
        );

        Ok(AdvanceOutcome {
            record,
            position: state.position,
            phase: state.phase,
            score_warning,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.state.as_ref().map(|s| &s.dataset)
    }

    pub fn position(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.position)
    }

    pub fn phase(&self) -> Option<SessionPhase> {
        self.state.as_ref().map(|s| s.phase)
    }

    pub fn pending(&self) -> Option<&Accumulator> {
        self.state.as_ref().map(|s| &s.pending)
    }

    /// Item currently on screen
    pub fn current_item(&self) -> Result<&TranslationItem> {
        self.state.as_ref().ok_or(Error::NoDataset)?.require_item()
    }

    pub fn view(&self) -> SessionView {
        match &self.state {
            None => SessionView {
                dataset: None,
                total: 0,
                position: 0,
                phase: None,
                item: None,
                classification: Classification::Spans,
                pending: SpanSet::default(),
            },
            Some(state) => SessionView {
                dataset: Some(state.dataset.name().to_string()),
                total: state.dataset.len(),
                position: state.position,
                phase: Some(state.phase),
                item: state.require_item().ok().cloned(),
                classification: state.pending.classification(),
                pending: state.pending.contents().clone(),
            },
        }
    }

    fn state_mut(&mut self) -> Result<&mut SessionState> {
        self.state.as_mut().ok_or(Error::NoDataset)
    }
}
