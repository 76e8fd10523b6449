//! Record Writer
//!
//! Append-only output stores, one set per dataset inside the output folder:
//! - `<stem>_annotations.jsonl` (or `.csv`): one annotation record per advance
//! - `<stem>_score.csv`: `source,target,rater,score` rows
//!
//! Files are created on first write (with a header for CSV), entries are
//! never rewritten, and each record goes out in a single `write_all`.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::dataset::Dataset;
use crate::models::{AnnotationRecord, ItemId, Rater, ScoreRecord, SpanSet};
use crate::{Error, Result};

/// Destination for committed records
pub trait RecordSink {
    fn append_annotation(&mut self, dataset: &Dataset, record: &AnnotationRecord) -> Result<()>;
    fn append_score(&mut self, dataset: &Dataset, score: &ScoreRecord) -> Result<()>;
}

/// On-disk layout of the annotation store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// One flattened row per record, spans JSON-encoded in a column
    Csv,
}

impl AnnotationFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AnnotationFormat::Jsonl => "jsonl",
            AnnotationFormat::Csv => "csv",
        }
    }
}

/// Flattened CSV shape of an annotation record
#[derive(Debug, Serialize, Deserialize)]
struct AnnotationRow {
    record_id: Uuid,
    dataset: String,
    position: usize,
    id: String,
    source: String,
    target: String,
    reference: Option<String>,
    system: Option<String>,
    lp: Option<String>,
    doc: Option<String>,
    rater: Rater,
    score: u8,
    verdict: String,
    spans: String,
    created_at: DateTime<Utc>,
}

impl AnnotationRow {
    fn from_record(record: &AnnotationRecord) -> Result<Self> {
        Ok(Self {
            record_id: record.record_id,
            dataset: record.dataset.clone(),
            position: record.position,
            id: record.id.to_string(),
            source: record.source.clone(),
            target: record.target.clone(),
            reference: record.reference.clone(),
            system: record.system.clone(),
            lp: record.lp.clone(),
            doc: record.doc.clone(),
            rater: record.rater.clone(),
            score: record.score,
            verdict: record.annotation.verdict().to_string(),
            spans: serde_json::to_string(record.annotation.spans()).map_err(Error::persistence)?,
            created_at: record.created_at,
        })
    }

    fn into_record(self) -> Result<AnnotationRecord> {
        let annotation = match self.verdict.as_str() {
            "normal" => SpanSet::Normal(serde_json::from_str(&self.spans).map_err(|e| {
                Error::DataLoad(format!("record {}: bad spans column: {}", self.record_id, e))
            })?),
            "marked_correct" => SpanSet::MarkedCorrect,
            "marked_unusable" => SpanSet::MarkedUnusable,
            other => {
                return Err(Error::DataLoad(format!(
                    "record {}: unknown verdict {}",
                    self.record_id, other
                )))
            }
        };

        Ok(AnnotationRecord {
            record_id: self.record_id,
            dataset: self.dataset,
            position: self.position,
            id: ItemId::parse(&self.id),
            source: self.source,
            target: self.target,
            reference: self.reference,
            system: self.system,
            lp: self.lp,
            doc: self.doc,
            rater: self.rater,
            score: self.score,
            annotation,
            created_at: self.created_at,
        })
    }
}

/// File-backed record sink
#[derive(Debug, Clone)]
pub struct FileRecordWriter {
    output_dir: PathBuf,
    format: AnnotationFormat,
    write_scores: bool,
}

impl FileRecordWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: AnnotationFormat::default(),
            write_scores: true,
        }
    }

    pub fn with_format(mut self, format: AnnotationFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable the separate score file
    pub fn with_score_file(mut self, enabled: bool) -> Self {
        self.write_scores = enabled;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn annotation_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_annotations.{}", stem, self.format.extension()))
    }

    pub fn score_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{}_score.csv", stem))
    }
}

impl RecordSink for FileRecordWriter {
    fn append_annotation(&mut self, dataset: &Dataset, record: &AnnotationRecord) -> Result<()> {
        let path = self.annotation_path(dataset.stem());
        match self.format {
            AnnotationFormat::Jsonl => append_with(&path, |_| {
                let mut line = serde_json::to_vec(record).map_err(Error::persistence)?;
                line.push(b'\n');
                Ok(line)
            }),
            AnnotationFormat::Csv => {
                let row = AnnotationRow::from_record(record)?;
                append_with(&path, |new_file| csv_bytes(&row, new_file))
            }
        }?;
        debug!(path = %path.display(), record_id = %record.record_id, "Appended annotation");
        Ok(())
    }

    fn append_score(&mut self, dataset: &Dataset, score: &ScoreRecord) -> Result<()> {
        if !self.write_scores {
            return Ok(());
        }
        let path = self.score_path(dataset.stem());
        append_with(&path, |new_file| csv_bytes(score, new_file))?;
        debug!(path = %path.display(), "Appended score");
        Ok(())
    }
}

/// Open `path` for appending and write the bytes produced by `build`
///
/// `build` receives `true` when the file is new or empty so it can emit a
/// header. The data is synced before returning.
fn append_with<F>(path: &Path, build: F) -> Result<()>
where
    F: FnOnce(bool) -> Result<Vec<u8>>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::Persistence(format!("Cannot create {}: {}", parent.display(), e))
        })?;
    }

    let io_err = |e: std::io::Error| Error::Persistence(format!("{}: {}", path.display(), e));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    let new_file = file.metadata().map_err(io_err)?.len() == 0;

    let bytes = build(new_file)?;
    file.write_all(&bytes).map_err(io_err)?;
    file.sync_data().map_err(io_err)?;
    Ok(())
}

fn csv_bytes<T: Serialize>(row: &T, with_header: bool) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    wtr.serialize(row).map_err(Error::persistence)?;
    wtr.into_inner().map_err(Error::persistence)
}

/// Read an annotation store back in file order (format from extension)
pub fn read_annotations(path: &Path) -> Result<Vec<AnnotationRecord>> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let mut rdr = csv::Reader::from_path(path)
            .map_err(|e| Error::DataLoad(format!("{}: {}", path.display(), e)))?;
        let records: Result<Vec<_>> = rdr
            .deserialize::<AnnotationRow>()
            .map(|row| {
                row.map_err(|e| Error::DataLoad(format!("{}: {}", path.display(), e)))?
                    .into_record()
            })
            .collect();
        records
    } else {
        let file = std::fs::File::open(path)?;
        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                Error::DataLoad(format!("{}: line {}: {}", path.display(), idx + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Read a score file back in file order
pub fn read_scores(path: &Path) -> Result<Vec<ScoreRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| Error::DataLoad(format!("{}: {}", path.display(), e)))?;
    let scores: Result<Vec<_>> = rdr
        .deserialize::<ScoreRecord>()
        .map(|row| row.map_err(|e| Error::DataLoad(format!("{}: {}", path.display(), e))))
        .collect();
    scores
}

/// One file in the output folder
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Annotation and score files in `dir`, sorted by name
pub fn list_output_files(dir: &Path) -> Result<Vec<OutputFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_ascii_lowercase();
        if !(lower.ends_with(".csv") || lower.ends_with(".jsonl")) {
            continue;
        }
        files.push(OutputFile {
            name,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Resolve a listed output file name to its path
///
/// Refuses traversal, quotes and control characters so the name can be
/// echoed into a header.
pub fn resolve_output_file(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty()
        || name.contains("..")
        || name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '"') || c.is_control())
    {
        return Err(Error::InvalidInput(format!("Invalid output file name: {}", name)));
    }
    let path = dir.join(name);
    if !path.is_file() {
        return Err(Error::NotFound(format!("Output file not found: {}", name)));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorCategory, ErrorSpan, Severity, TranslationItem};
    use crate::raters::RaterRoster;

    fn dataset() -> Dataset {
        Dataset::from_reader(
            Path::new("news.csv"),
            "id,source,target\n1,\"Hello, world\",\"你好，世界\"\n".as_bytes(),
        )
        .unwrap()
    }

    fn record(annotation: SpanSet, score: u8) -> AnnotationRecord {
        let item = TranslationItem {
            id: ItemId::Int(1),
            source: "Hello, world".to_string(),
            target: "你好，世界".to_string(),
            reference: None,
            system: Some("sys\"A\"".to_string()),
            lp: Some("en-zh".to_string()),
            doc: None,
        };
        let rater = RaterRoster::default().resolve("rater2").unwrap();
        AnnotationRecord::new("news.csv", 0, &item, rater, score, annotation)
    }

    fn spans() -> SpanSet {
        SpanSet::Normal(vec![
            ErrorSpan {
                text: "你好".to_string(),
                start: 0,
                end: 2,
                severity: Severity::Minor,
                category: ErrorCategory::new("Style").with_subcategory("Awkward"),
                correction: Some("您好".to_string()),
            },
            ErrorSpan {
                text: "世界".to_string(),
                start: 3,
                end: 5,
                severity: Severity::Major,
                category: ErrorCategory::new("Accuracy").with_subcategory("Mistranslation"),
                correction: None,
            },
        ])
    }

    #[test]
    fn test_jsonl_append_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("nested").join("output");
        let mut writer = FileRecordWriter::new(&out);
        let ds = dataset();

        writer.append_annotation(&ds, &record(spans(), 73)).unwrap();
        writer
            .append_annotation(&ds, &record(SpanSet::MarkedCorrect, 100))
            .unwrap();

        let path = out.join("news_annotations.jsonl");
        let records = read_annotations(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 73);
        assert_eq!(records[0].annotation, spans());
        assert_eq!(records[1].annotation, SpanSet::MarkedCorrect);
    }

    #[test]
    fn test_csv_annotation_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut writer = FileRecordWriter::new(dir.path()).with_format(AnnotationFormat::Csv);
        let ds = dataset();
        let first = record(spans(), 73);

        writer.append_annotation(&ds, &first).unwrap();
        writer
            .append_annotation(&ds, &record(SpanSet::MarkedUnusable, 5))
            .unwrap();

        let path = dir.path().join("news_annotations.csv");
        let content = std::fs::read_to_string(&path).unwrap();
        // Header exactly once
        assert_eq!(content.matches("record_id,dataset").count(), 1);

        let records = read_annotations(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(records[1].annotation, SpanSet::MarkedUnusable);
    }

    #[test]
    fn test_score_file_header_written_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut writer = FileRecordWriter::new(dir.path());
        let ds = dataset();

        for score in [10, 20] {
            let rec = record(SpanSet::default(), score);
            writer.append_score(&ds, &ScoreRecord::from(&rec)).unwrap();
        }

        let path = dir.path().join("news_score.csv");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("source,target,rater,score\n"));
        assert_eq!(content.lines().count(), 3);

        let scores = read_scores(&path).unwrap();
        assert_eq!(scores.iter().map(|s| s.score).collect::<Vec<_>>(), vec![10, 20]);
        assert_eq!(scores[0].target, "你好，世界");
    }

    #[test]
    fn test_header_added_to_existing_empty_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("news_score.csv");
        std::fs::write(&path, "").unwrap();

        let mut writer = FileRecordWriter::new(dir.path());
        let rec = record(SpanSet::default(), 42);
        writer.append_score(&dataset(), &ScoreRecord::from(&rec)).unwrap();
        assert_eq!(read_scores(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_score_file_can_be_disabled() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut writer = FileRecordWriter::new(dir.path()).with_score_file(false);
        let rec = record(SpanSet::default(), 42);
        writer.append_score(&dataset(), &ScoreRecord::from(&rec)).unwrap();
        assert!(!dir.path().join("news_score.csv").exists());
    }

    #[test]
    fn test_unwritable_destination_is_persistence_error() {
        let dir = tempfile::TempDir::new().unwrap();
        // A regular file where the output folder should be
        let blocker = dir.path().join("output");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut writer = FileRecordWriter::new(&blocker);
        let err = writer
            .append_annotation(&dataset(), &record(SpanSet::default(), 1))
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[test]
    fn test_list_and_resolve_output_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_score.csv"), "x").unwrap();
        std::fs::write(dir.path().join("a_annotations.jsonl"), "{}").unwrap();
        std::fs::write(dir.path().join("readme.md"), "skip").unwrap();

        let names: Vec<_> = list_output_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a_annotations.jsonl", "b_score.csv"]);

        assert!(resolve_output_file(dir.path(), "b_score.csv").is_ok());
        assert!(matches!(
            resolve_output_file(dir.path(), "../b_score.csv"),
            Err(Error::InvalidInput(_))
        ));

        std::fs::write(dir.path().join("say \"hi\"_score.csv"), "x").unwrap();
        for name in ["say \"hi\"_score.csv", "a\r\nb_score.csv"] {
            assert!(matches!(
                resolve_output_file(dir.path(), name),
                Err(Error::InvalidInput(_))
            ));
        }
        assert!(list_output_files(&dir.path().join("missing")).unwrap().is_empty());
    }
}
