//! Annotation Accumulator
//!
//! Scratch buffer of error spans for the item currently on screen. Spans
//! are validated against the item's translation before they are accepted;
//! a rejected submission never disturbs what was already collected.

use serde::Serialize;

use crate::models::{ErrorCategory, ErrorSpan, Severity, SpanSet};
use crate::{Error, Result};

/// Classification of the pending item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Zero or more manual spans
    Spans,
    MarkedCorrect,
    MarkedUnusable,
}

/// Per-item span buffer
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    buffer: SpanSet,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate `span_text` in `target` and append it as a new error span
    ///
    /// The first occurrence wins when the text appears more than once.
    /// Offsets are character positions, not byte positions.
    pub fn add_span(
        &mut self,
        target: &str,
        span_text: &str,
        severity: Severity,
        category: ErrorCategory,
        correction: Option<String>,
    ) -> Result<&ErrorSpan> {
        if span_text.is_empty() {
            return Err(Error::InvalidInput("Error span text is empty".to_string()));
        }

        let spans = match &mut self.buffer {
            SpanSet::Normal(spans) => spans,
            other => {
                return Err(Error::Conflict(format!(
                    "Item is already {}; no further spans can be added",
                    describe(other)
                )))
            }
        };

        let byte_start = target.find(span_text).ok_or_else(|| Error::SpanNotFound {
            span: span_text.to_string(),
        })?;
        let start = target[..byte_start].chars().count();
        let end = start + span_text.chars().count();

        spans.push(ErrorSpan {
            text: span_text.to_string(),
            start,
            end,
            severity,
            category,
            correction: correction.filter(|c| !c.trim().is_empty()),
        });

        // Just pushed, so the last element exists
        Ok(&spans[spans.len() - 1])
    }

    /// Classify the item as free of errors
    pub fn mark_all_correct(&mut self) -> Result<()> {
        self.set_sentinel(SpanSet::MarkedCorrect)
    }

    /// Classify the item as unusable (too many errors to annotate)
    pub fn mark_too_many_errors(&mut self) -> Result<()> {
        self.set_sentinel(SpanSet::MarkedUnusable)
    }

    fn set_sentinel(&mut self, sentinel: SpanSet) -> Result<()> {
        match &self.buffer {
            SpanSet::Normal(spans) if spans.is_empty() => {
                self.buffer = sentinel;
                Ok(())
            }
            SpanSet::Normal(spans) => Err(Error::Conflict(format!(
                "Item already has {} error span(s); cannot also mark it {}",
                spans.len(),
                describe(&sentinel)
            ))),
            current if *current == sentinel => Ok(()),
            current => Err(Error::Conflict(format!(
                "Item is already {}; cannot mark it {}",
                describe(current),
                describe(&sentinel)
            ))),
        }
    }

    /// Move the buffer out for commit, leaving it empty
    pub fn take(&mut self) -> SpanSet {
        std::mem::take(&mut self.buffer)
    }

    /// Discard everything collected for the current item
    pub fn reset(&mut self) {
        self.buffer = SpanSet::default();
    }

    pub fn contents(&self) -> &SpanSet {
        &self.buffer
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        self.buffer.spans()
    }

    pub fn classification(&self) -> Classification {
        match self.buffer {
            SpanSet::Normal(_) => Classification::Spans,
            SpanSet::MarkedCorrect => Classification::MarkedCorrect,
            SpanSet::MarkedUnusable => Classification::MarkedUnusable,
        }
    }

    /// Number of entries; a sentinel counts as one
    pub fn len(&self) -> usize {
        match &self.buffer {
            SpanSet::Normal(spans) => spans.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn describe(set: &SpanSet) -> &'static str {
    match set {
        SpanSet::Normal(_) => "annotated",
        SpanSet::MarkedCorrect => "marked correct",
        SpanSet::MarkedUnusable => "marked unusable",
    }
}
