//! End-to-end session tests against the file-backed record writer
//!
//! Exercises the full load → annotate → advance → read back loop on real
//! files in a scratch directory.

use std::path::PathBuf;

use mqm_common::models::{ErrorCategory, ItemId, Severity, SpanSet};
use mqm_common::raters::RaterRoster;
use mqm_common::writer::{read_annotations, read_scores, AnnotationFormat, FileRecordWriter};
use mqm_common::{Error, SessionController, SessionPhase};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    controller: SessionController,
}

impl Fixture {
    fn new(format: AnnotationFormat, dataset: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(input.join("test.csv"), dataset).unwrap();

        let writer = FileRecordWriter::new(dir.path().join("output")).with_format(format);
        let mut controller = SessionController::new(Box::new(writer));
        controller.load_dataset(&input.join("test.csv")).unwrap();
        Self { dir, controller }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join("output").join(name)
    }
}

fn fluency() -> ErrorCategory {
    ErrorCategory::new("Fluency").with_subcategory("Grammar")
}

#[test]
fn test_round_trip_two_spans_jsonl() {
    let mut fx = Fixture::new(
        AnnotationFormat::Jsonl,
        "source,target\nThe cat sat.,貓坐了在墊子上。\n",
    );
    let roster = RaterRoster::default();

    fx.controller
        .record_span("坐了在", Severity::Major, fluency(), Some("坐在".to_string()))
        .unwrap();
    fx.controller
        .record_span("墊子", Severity::Minor, ErrorCategory::new("Terminology"), None)
        .unwrap();
    let outcome = fx
        .controller
        .advance(73, roster.resolve("rater3").unwrap())
        .unwrap();
    assert_eq!(outcome.phase, SessionPhase::Completed);

    let records = read_annotations(&fx.output("test_annotations.jsonl")).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.score, 73);
    assert_eq!(record.rater.as_str(), "rater3");
    assert_eq!(record.dataset, "test.csv");

    let spans = record.annotation.spans();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].text, "坐了在");
    assert_eq!((spans[0].start, spans[0].end), (1, 4));
    assert_eq!(spans[0].correction.as_deref(), Some("坐在"));
    assert_eq!(spans[1].text, "墊子");
    assert_eq!(
        spans[1].category.subcategory.as_deref(),
        Some("Inappropriate")
    );

    let scores = read_scores(&fx.output("test_score.csv")).unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 73);
}

#[test]
fn test_round_trip_csv_store() {
    let mut fx = Fixture::new(
        AnnotationFormat::Csv,
        "id,source,target,lp\n11,a,\"alpha, beta\",en-de\n12,b,gamma,en-de\n",
    );
    let rater = RaterRoster::default().default_rater().clone();

    fx.controller
        .record_span("beta", Severity::Minor, fluency(), None)
        .unwrap();
    fx.controller
        .record_span("alpha", Severity::Major, fluency(), None)
        .unwrap();
    fx.controller.advance(73, rater.clone()).unwrap();
    fx.controller.mark_all_correct().unwrap();
    fx.controller.advance(100, rater).unwrap();

    let records = read_annotations(&fx.output("test_annotations.csv")).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, ItemId::Int(11));
    assert_eq!(records[0].lp.as_deref(), Some("en-de"));
    let texts: Vec<_> = records[0]
        .annotation
        .spans()
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(texts, vec!["beta", "alpha"]);
    assert_eq!(records[1].annotation, SpanSet::MarkedCorrect);
}

#[test]
fn test_retry_after_persistence_failure_commits_once() {
    let mut fx = Fixture::new(AnnotationFormat::Jsonl, "source,target\na,b\nc,d\n");
    let rater = RaterRoster::default().default_rater().clone();

    // Block the output folder with a regular file
    let output = fx.dir.path().join("output");
    std::fs::write(&output, "in the way").unwrap();

    let err = fx.controller.advance(60, rater.clone()).unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(fx.controller.position(), Some(0));

    std::fs::remove_file(&output).unwrap();
    fx.controller.advance(60, rater).unwrap();
    assert_eq!(fx.controller.position(), Some(1));

    let records = read_annotations(&fx.output("test_annotations.jsonl")).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_outputs_accumulate_across_sessions() {
    let mut fx = Fixture::new(AnnotationFormat::Jsonl, "source,target\na,b\n");
    let rater = RaterRoster::default().default_rater().clone();
    fx.controller.advance(10, rater.clone()).unwrap();

    // Reloading the same file starts over but never truncates earlier output
    let path = fx.dir.path().join("input").join("test.csv");
    fx.controller.load_dataset(&path).unwrap();
    assert_eq!(fx.controller.phase(), Some(SessionPhase::AwaitingItem));
    fx.controller.advance(20, rater).unwrap();

    let records = read_annotations(&fx.output("test_annotations.jsonl")).unwrap();
    assert_eq!(
        records.iter().map(|r| r.score).collect::<Vec<_>>(),
        vec![10, 20]
    );
}
