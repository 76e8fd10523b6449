//! Dataset Store and dataset catalog
//!
//! A dataset is one CSV file with a header row. `source` and `target` are
//! required; `id`, `reference`, `system`, `lp` and `doc` are optional and
//! any other column is ignored. Items are immutable once loaded.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::{ItemId, TranslationItem};
use crate::{Error, Result};

/// Column positions resolved from the header row
struct Columns {
    id: Option<usize>,
    source: usize,
    target: usize,
    reference: Option<usize>,
    system: Option<usize>,
    lp: Option<usize>,
    doc: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers.iter().position(|h| {
                h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name)
            })
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| Error::DataLoad(format!("Missing required column: {}", name)))
        };

        Ok(Self {
            id: find("id"),
            source: require("source")?,
            target: require("target")?,
            reference: find("reference"),
            system: find("system"),
            lp: find("lp"),
            doc: find("doc"),
        })
    }
}

/// Ordered, immutable collection of translation items from one file
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    name: String,
    items: Vec<TranslationItem>,
    /// id → row position, built at load time
    index: HashMap<ItemId, usize>,
}

impl Dataset {
    /// Load a dataset file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::DataLoad(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let dataset = Self::from_reader(path, file)?;
        info!(
            dataset = %dataset.name,
            items = dataset.len(),
            "Loaded dataset from {}",
            path.display()
        );
        Ok(dataset)
    }

    /// Parse dataset rows from any reader; `path` names the dataset
    pub fn from_reader<R: Read>(path: &Path, reader: R) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset.csv".to_string());

        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| Error::DataLoad(format!("{}: unreadable header: {}", name, e)))?
            .clone();
        let columns = Columns::resolve(&headers)
            .map_err(|e| Error::DataLoad(format!("{}: {}", name, e)))?;

        let mut items = Vec::new();
        let mut index = HashMap::new();

        for (row, record) in rdr.records().enumerate() {
            // +2: one for the header line, one for 1-based numbering
            let line = row + 2;
            let record = record
                .map_err(|e| Error::DataLoad(format!("{}: malformed row {}: {}", name, line, e)))?;

            let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();
            let optional = |idx: Option<usize>| {
                idx.and_then(|i| record.get(i))
                    .map(str::to_string)
                    .filter(|v| !v.trim().is_empty())
            };

            let id = match columns.id {
                Some(idx) => {
                    let raw = record.get(idx).unwrap_or("");
                    if raw.trim().is_empty() {
                        return Err(Error::DataLoad(format!(
                            "{}: row {} has an empty id",
                            name, line
                        )));
                    }
                    ItemId::parse(raw)
                }
                None => ItemId::Int(items.len() as i64),
            };

            if index.insert(id.clone(), items.len()).is_some() {
                return Err(Error::DataLoad(format!(
                    "{}: duplicate id {} at row {}",
                    name, id, line
                )));
            }

            items.push(TranslationItem {
                id,
                source: cell(columns.source),
                target: cell(columns.target),
                reference: optional(columns.reference),
                system: optional(columns.system),
                lp: optional(columns.lp),
                doc: optional(columns.doc),
            });
        }

        if items.is_empty() {
            return Err(Error::DataLoad(format!("{}: dataset has no rows", name)));
        }

        debug!(dataset = %name, has_ids = columns.id.is_some(), "Built id index");

        Ok(Self {
            path: path.to_path_buf(),
            name,
            items,
            index,
        })
    }

    /// File name, e.g. `test.csv`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name without extension; prefixes the output files
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[TranslationItem] {
        &self.items
    }

    pub fn item_at(&self, position: usize) -> Result<&TranslationItem> {
        self.items.get(position).ok_or(Error::OutOfRange {
            position,
            len: self.items.len(),
        })
    }

    pub fn position_for_id(&self, id: &ItemId) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("No item with id {} in {}", id, self.name)))
    }
}

/// Dataset files available in the input directory
#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    input_dir: PathBuf,
}

impl DatasetCatalog {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// `.csv` file names in the input directory, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.input_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.input_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_ascii_lowercase().ends_with(".csv") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a selected file name to its path inside the input directory
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(Error::InvalidInput(format!(
                "Invalid dataset file name: {}",
                file_name
            )));
        }

        let path = self.input_dir.join(file_name);
        if !path.is_file() {
            return Err(Error::NotFound(format!("Dataset file not found: {}", file_name)));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Result<Dataset> {
        Dataset::from_reader(Path::new("sample.csv"), csv.as_bytes())
    }

    #[test]
    fn test_load_minimal_columns() {
        let ds = parse("source,target\nHello,你好\nBye,再見\n").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.name(), "sample.csv");
        assert_eq!(ds.stem(), "sample");
        assert_eq!(ds.item_at(1).unwrap().target, "再見");
        // Positions double as ids when the file has none
        assert_eq!(ds.item_at(1).unwrap().id, ItemId::Int(1));
    }

    #[test]
    fn test_optional_columns_and_quoting() {
        let ds = parse(
            "id,source,target,reference,system,lp,doc,extra\n\
             7,\"Hi, there\",\"嗨，\"\"你\"\"\",ref,sysA,en-zh,d1,ignored\n\
             3,Second,第二,,,en-zh,\n",
        )
        .unwrap();

        let first = ds.item_at(0).unwrap();
        assert_eq!(first.id, ItemId::Int(7));
        assert_eq!(first.source, "Hi, there");
        assert_eq!(first.target, "嗨，\"你\"");
        assert_eq!(first.reference.as_deref(), Some("ref"));
        assert_eq!(first.system.as_deref(), Some("sysA"));
        assert_eq!(first.doc.as_deref(), Some("d1"));

        let second = ds.item_at(1).unwrap();
        assert!(second.reference.is_none());
        assert!(second.doc.is_none());
        assert_eq!(second.lp.as_deref(), Some("en-zh"));
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse("id,source\n1,Hello\n").unwrap_err();
        assert!(matches!(err, Error::DataLoad(ref msg) if msg.contains("target")));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        assert!(matches!(parse("source,target\n"), Err(Error::DataLoad(_))));
    }

    #[test]
    fn test_ragged_row_rejected() {
        assert!(matches!(
            parse("source,target\nA,B\nC,D,E\n"),
            Err(Error::DataLoad(_))
        ));
    }

    #[test]
    fn test_duplicate_and_empty_ids_rejected() {
        assert!(matches!(
            parse("id,source,target\n1,a,b\n1,c,d\n"),
            Err(Error::DataLoad(_))
        ));
        assert!(matches!(
            parse("id,source,target\n,a,b\n"),
            Err(Error::DataLoad(_))
        ));
    }

    #[test]
    fn test_id_lookup_with_unsorted_ids() {
        let ds = parse("id,source,target\n30,a,A\n10,b,B\n20,c,C\n").unwrap();
        assert_eq!(ds.position_for_id(&ItemId::Int(20)).unwrap(), 2);
        assert_eq!(ds.position_for_id(&ItemId::Int(30)).unwrap(), 0);
        assert!(matches!(
            ds.position_for_id(&ItemId::Int(99)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_item_at_out_of_range() {
        let ds = parse("source,target\na,b\n").unwrap();
        assert!(matches!(
            ds.item_at(1),
            Err(Error::OutOfRange { position: 1, len: 1 })
        ));
    }

    #[test]
    fn test_header_with_bom() {
        let ds = parse("\u{feff}source,target\na,b\n").unwrap();
        assert_eq!(ds.item_at(0).unwrap().source, "a");
    }

    #[test]
    fn test_catalog_lists_csv_only() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.csv"), "source,target\nx,y\n").unwrap();
        std::fs::write(dir.path().join("a.csv"), "source,target\nx,y\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore").unwrap();

        let catalog = DatasetCatalog::new(dir.path());
        assert_eq!(catalog.list().unwrap(), vec!["a.csv", "b.csv"]);
        assert!(catalog.resolve("a.csv").is_ok());
        assert!(matches!(catalog.resolve("../a.csv"), Err(Error::InvalidInput(_))));
        assert!(matches!(catalog.resolve("c.csv"), Err(Error::NotFound(_))));
    }
}
