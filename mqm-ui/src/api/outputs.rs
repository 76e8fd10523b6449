//! Output file listing, download and mirroring

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use mqm_common::writer::{list_output_files, resolve_output_file, OutputFile};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::sync::SyncReport;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct OutputsResponse {
    pub status: String,
    pub files: Vec<OutputFile>,
}

/// GET /api/outputs
pub async fn list_outputs(State(state): State<AppState>) -> ApiResult<Json<OutputsResponse>> {
    let files = list_output_files(&state.output_dir)?;
    Ok(Json(OutputsResponse {
        status: format!("Output file list refreshed ({} files)", files.len()),
        files,
    }))
}

/// GET /api/outputs/:name
///
/// Streams one output file back as an attachment.
pub async fn download_output(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let path = resolve_output_file(&state.output_dir, &name)?;
    let bytes = tokio::fs::read(&path).await?;

    let content_type = if name.to_ascii_lowercase().ends_with(".jsonl") {
        "application/x-ndjson"
    } else {
        "text/csv; charset=utf-8"
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&name)),
        ],
        bytes,
    )
        .into_response())
}

/// `Content-Disposition` value for a validated output file name
///
/// Header values must be visible ASCII, so non-ASCII names get an `_`
/// fallback plus an RFC 5987 `filename*` carrying the UTF-8 name.
fn attachment_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    if fallback == name {
        return format!("attachment; filename=\"{}\"", name);
    }

    let mut encoded = String::new();
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: String,
    pub report: SyncReport,
}

/// POST /api/sync
pub async fn trigger_sync(State(state): State<AppState>) -> ApiResult<Json<SyncResponse>> {
    let sync = state
        .sync
        .as_ref()
        .ok_or_else(|| ApiError::Conflict("Output mirroring is not configured".to_string()))?;

    let report = Arc::clone(sync).run().await?;
    Ok(Json(SyncResponse {
        status: format!(
            "Synced {} file(s) to {}",
            report.copied.len(),
            sync.mirror_dir().display()
        ),
        report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_name_disposition() {
        assert_eq!(
            attachment_disposition("news_score.csv"),
            "attachment; filename=\"news_score.csv\""
        );
    }

    #[test]
    fn test_non_ascii_name_disposition() {
        let value = attachment_disposition("新聞_score.csv");
        assert_eq!(
            value,
            "attachment; filename=\"__score.csv\"; filename*=UTF-8''%E6%96%B0%E8%81%9E_score.csv"
        );
        assert!(axum::http::HeaderValue::from_str(&value).is_ok());
    }
}
