//! Selection endpoints: taxonomy, rater roster and dataset files

use std::sync::Arc;

use axum::{extract::State, Json};
use mqm_common::taxonomy::{self, CategoryDef};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::session::StatusResponse;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/categories
pub async fn list_categories() -> Json<&'static [CategoryDef]> {
    Json(taxonomy::categories())
}

#[derive(Debug, Serialize)]
pub struct RatersResponse {
    pub raters: Vec<String>,
    pub selected: String,
}

/// GET /api/raters
pub async fn list_raters(State(state): State<AppState>) -> Json<RatersResponse> {
    let selected = state.selected_rater.read().await.to_string();
    Json(RatersResponse {
        raters: state
            .roster
            .raters()
            .iter()
            .map(|r| r.to_string())
            .collect(),
        selected,
    })
}

#[derive(Debug, Deserialize)]
pub struct SelectRaterRequest {
    pub rater: String,
}

/// POST /api/rater
pub async fn select_rater(
    State(state): State<AppState>,
    Json(request): Json<SelectRaterRequest>,
) -> ApiResult<Json<RatersResponse>> {
    let rater = state.roster.resolve(&request.rater)?;
    info!(rater = %rater, "Rater selected");
    *state.selected_rater.write().await = rater;
    Ok(list_raters(State(state)).await)
}

#[derive(Debug, Serialize)]
pub struct DatasetsResponse {
    pub datasets: Vec<String>,
    /// File name of the loaded dataset, if any
    pub active: Option<String>,
}

/// GET /api/datasets
pub async fn list_datasets(State(state): State<AppState>) -> ApiResult<Json<DatasetsResponse>> {
    let catalog = Arc::clone(&state.catalog);
    let datasets = tokio::task::spawn_blocking(move || catalog.list())
        .await
        .map_err(|e| ApiError::Internal(format!("Dataset listing failed: {}", e)))??;
    let controller = state.session.lock().await;
    Ok(Json(DatasetsResponse {
        datasets,
        active: controller.dataset().map(|d| d.name().to_string()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelectDatasetRequest {
    pub file: String,
}

/// POST /api/dataset
///
/// Loads the named file from the input folder and starts over at its
/// first item. A load failure keeps the current session as it was.
pub async fn select_dataset(
    State(state): State<AppState>,
    Json(request): Json<SelectDatasetRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let file = request.file.trim().to_string();
    let path = state.catalog.resolve(&file)?;

    let response = state
        .with_session_blocking(move |controller| {
            controller.load_dataset(&path)?;
            Ok(StatusResponse::new(format!("Loaded file: {}", file), controller))
        })
        .await?;
    Ok(Json(response))
}
