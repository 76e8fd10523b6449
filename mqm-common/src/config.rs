//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from, in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not an error; the workbench starts on defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::writer::AnnotationFormat;
use crate::{Error, Result};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "MQM_ROOT_FOLDER";
/// Shorter alias, consulted after `MQM_ROOT_FOLDER`
pub const ROOT_ENV: &str = "MQM_ROOT";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding `input/` and `output/` (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Dataset folder; defaults to `<root>/input`
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// Output folder; defaults to `<root>/output`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Dataset file loaded at startup, relative to the input folder
    #[serde(default)]
    pub default_dataset: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_raters")]
    pub raters: Vec<String>,

    #[serde(default)]
    pub annotation_format: AnnotationFormat,

    /// Also append `source,target,rater,score` rows to `<stem>_score.csv`
    #[serde(default = "default_true")]
    pub write_score_file: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Output mirroring to a remote-backed folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Destination folder; sync is disabled when unset
    #[serde(default)]
    pub mirror_dir: Option<PathBuf>,

    /// Seconds between automatic syncs; manual only when unset or 0
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            input_dir: None,
            output_dir: None,
            default_dataset: None,
            host: default_host(),
            port: default_port(),
            raters: default_raters(),
            annotation_format: AnnotationFormat::default(),
            write_score_file: true,
            logging: LoggingConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Dataset folder for a resolved root
    pub fn input_dir(&self, root: &Path) -> PathBuf {
        self.input_dir
            .clone()
            .unwrap_or_else(|| root.join("input"))
    }

    /// Output folder for a resolved root
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| root.join("output"))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Built-in rater roster
pub fn default_raters() -> Vec<String> {
    (1..=7).map(|n| format!("rater{}", n)).collect()
}

/// Compiled default root folder
pub fn default_root_folder() -> PathBuf {
    PathBuf::from("evaluation_dataset")
}

/// Default TOML location: `<config dir>/mqm/mqm.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mqm").join("mqm.toml"))
}

/// Load a TOML config file
///
/// A missing file logs a warning and yields defaults. A file that exists
/// but does not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    if config.raters.iter().all(|r| r.trim().is_empty()) {
        return Err(Error::Config(format!(
            "{}: raters list must contain at least one name",
            path.display()
        )));
    }

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Root folder resolution: CLI → `MQM_ROOT_FOLDER` → `MQM_ROOT` → TOML → default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
        if let Ok(path) = std::env::var(var) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
    }

    if let Some(root) = &config.root_folder {
        return root.clone();
    }

    default_root_folder()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.raters.len(), 7);
        assert_eq!(config.annotation_format, AnnotationFormat::Jsonl);
        assert!(config.write_score_file);
        assert_eq!(config.logging.level, "info");
        assert!(config.sync.mirror_dir.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            port = 9000
            annotation_format = "csv"

            [sync]
            mirror_dir = "/mnt/share"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.annotation_format, AnnotationFormat::Csv);
        assert_eq!(config.raters, default_raters());
        assert_eq!(config.sync.mirror_dir, Some(PathBuf::from("/mnt/share")));
        assert!(config.sync.interval_secs.is_none());
    }

    #[test]
    fn test_dir_defaults_follow_root() {
        let config = TomlConfig::default();
        let root = Path::new("/data/mqm");
        assert_eq!(config.input_dir(root), root.join("input"));
        assert_eq!(config.output_dir(root), root.join("output"));
    }

    #[test]
    fn test_cli_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..TomlConfig::default()
        };
        let root = resolve_root_folder(Some(Path::new("/from/cli")), &config);
        assert_eq!(root, PathBuf::from("/from/cli"));
    }
}
