//! Output mirroring
//!
//! Copies new or changed output files into a mirror folder (typically a
//! mounted share or a folder watched by a sync client). Only reads the
//! output folder; session state is never touched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mqm_common::writer::list_output_files;
use mqm_common::{Error, Result};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Summary of one sync pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Files copied in this pass
    pub copied: Vec<String>,
    /// Files already up to date
    pub unchanged: usize,
}

/// One-way mirror of the output folder
#[derive(Debug, Clone)]
pub struct MirrorSync {
    source: PathBuf,
    mirror: PathBuf,
}

impl MirrorSync {
    pub fn new(source: impl Into<PathBuf>, mirror: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            mirror: mirror.into(),
        }
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror
    }

    /// Copy every output file whose size or mtime differs from the mirror
    pub fn sync_once(&self) -> Result<SyncReport> {
        std::fs::create_dir_all(&self.mirror).map_err(|e| {
            Error::Persistence(format!(
                "Create mirror folder {} failed: {}",
                self.mirror.display(),
                e
            ))
        })?;

        let mut report = SyncReport::default();
        for file in list_output_files(&self.source)? {
            let src = self.source.join(&file.name);
            let dst = self.mirror.join(&file.name);

            if !needs_copy(&src, &dst)? {
                report.unchanged += 1;
                continue;
            }

            // Copy beside the destination, then rename over it
            let partial = self.mirror.join(format!(".{}.part", file.name));
            std::fs::copy(&src, &partial)
                .and_then(|_| std::fs::rename(&partial, &dst))
                .map_err(|e| {
                    Error::Persistence(format!("Mirror {} failed: {}", file.name, e))
                })?;
            debug!(file = %file.name, "Mirrored output file");
            report.copied.push(file.name);
        }

        info!(
            mirror = %self.mirror.display(),
            copied = report.copied.len(),
            unchanged = report.unchanged,
            "Output sync finished"
        );
        Ok(report)
    }

    /// Run `sync_once` on a blocking thread
    pub async fn run(self: Arc<Self>) -> Result<SyncReport> {
        tokio::task::spawn_blocking(move || self.sync_once())
            .await
            .map_err(|e| Error::Persistence(format!("Sync task failed: {}", e)))?
    }

    /// Sync every `interval` until the runtime shuts down
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; skip it so startup is not delayed
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = Arc::clone(&self).run().await {
                    warn!(error = %e, "Periodic output sync failed");
                }
            }
        })
    }
}

fn needs_copy(src: &Path, dst: &Path) -> Result<bool> {
    let src_meta = std::fs::metadata(src)?;
    let dst_meta = match std::fs::metadata(dst) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };

    if src_meta.len() != dst_meta.len() {
        return Ok(true);
    }
    match (src_meta.modified(), dst_meta.modified()) {
        (Ok(src_time), Ok(dst_time)) => Ok(src_time > dst_time),
        _ => Ok(true),
    }
}
