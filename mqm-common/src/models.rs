//! Core data model: dataset items, error spans and finalized records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Highest score an operator can assign (0 = unusable, 100 = perfect)
pub const MAX_SCORE: u32 = 100;

/// Item identifier as read from the `id` column
///
/// Integers order numerically and sort before textual ids, which order
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl ItemId {
    /// Parse an id cell: anything that reads as an `i64` is numeric
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => ItemId::Int(n),
            Err(_) => ItemId::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(n) => write!(f, "{}", n),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

/// One row of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationItem {
    pub id: ItemId,
    pub source: String,
    /// Machine translation being graded
    pub target: String,
    pub reference: Option<String>,
    pub system: Option<String>,
    /// Language pair, e.g. `en-zh`
    pub lp: Option<String>,
    /// Document grouping
    pub doc: Option<String>,
}

/// Error severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "No-error")]
    NoError,
    Minor,
    Major,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::NoError => "No-error",
            Severity::Minor => "Minor",
            Severity::Major => "Major",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hierarchical MQM label: category, optional subcategory, optional free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCategory {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub other: Option<String>,
}

impl ErrorCategory {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: None,
            other: None,
        }
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_other(mut self, other: impl Into<String>) -> Self {
        self.other = Some(other.into());
        self
    }

    /// Flat `category/subcategory` label used by tabular exports
    pub fn label(&self) -> String {
        match &self.subcategory {
            Some(sub) => format!("{}/{}", self.category, sub),
            None => self.category.clone(),
        }
    }
}

/// One flagged error inside the current item's translation
///
/// `start`/`end` count characters (Unicode scalar values), so
/// `target.chars().skip(start).take(end - start)` yields `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub severity: Severity,
    pub category: ErrorCategory,
    /// Operator's corrected wording for the span, if given
    #[serde(default)]
    pub correction: Option<String>,
}

/// Annotation outcome for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "spans", rename_all = "snake_case")]
pub enum SpanSet {
    /// Manually entered spans in submission order (possibly empty)
    Normal(Vec<ErrorSpan>),
    /// Operator declared the translation free of errors
    MarkedCorrect,
    /// Operator declared the translation unusable (too many errors)
    MarkedUnusable,
}

impl SpanSet {
    pub fn verdict(&self) -> &'static str {
        match self {
            SpanSet::Normal(_) => "normal",
            SpanSet::MarkedCorrect => "marked_correct",
            SpanSet::MarkedUnusable => "marked_unusable",
        }
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        match self {
            SpanSet::Normal(spans) => spans,
            _ => &[],
        }
    }
}

impl Default for SpanSet {
    fn default() -> Self {
        SpanSet::Normal(Vec::new())
    }
}

/// Rater identifier, validated against the configured roster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rater(String);

impl Rater {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Rater(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finalized judgment for one (item, rater) pair
///
/// Created once per advance and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub record_id: Uuid,
    /// Dataset file name the item came from
    pub dataset: String,
    /// Row position of the item within the dataset
    pub position: usize,
    pub id: ItemId,
    pub source: String,
    pub target: String,
    pub reference: Option<String>,
    pub system: Option<String>,
    pub lp: Option<String>,
    pub doc: Option<String>,
    pub rater: Rater,
    pub score: u8,
    pub annotation: SpanSet,
    pub created_at: DateTime<Utc>,
}

impl AnnotationRecord {
    /// Build a record from the item being committed
    pub fn new(
        dataset: &str,
        position: usize,
        item: &TranslationItem,
        rater: Rater,
        score: u8,
        annotation: SpanSet,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            dataset: dataset.to_string(),
            position,
            id: item.id.clone(),
            source: item.source.clone(),
            target: item.target.clone(),
            reference: item.reference.clone(),
            system: item.system.clone(),
            lp: item.lp.clone(),
            doc: item.doc.clone(),
            rater,
            score,
            annotation,
            created_at: Utc::now(),
        }
    }
}

/// Row of the separate score file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub source: String,
    pub target: String,
    pub rater: Rater,
    pub score: u8,
}

impl From<&AnnotationRecord> for ScoreRecord {
    fn from(record: &AnnotationRecord) -> Self {
        Self {
            source: record.source.clone(),
            target: record.target.clone(),
            rater: record.rater.clone(),
            score: record.score,
        }
    }
}
