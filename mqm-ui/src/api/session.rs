//! Session endpoints: span entry, classification, scoring and navigation
//!
//! Each handler takes the session lock once, applies one controller
//! command and answers with a status line plus the fresh session view.

use axum::{extract::State, Json};
use mqm_common::models::{ErrorCategory, ErrorSpan, ItemId, Severity};
use mqm_common::session::SessionView;
use mqm_common::{SessionController, SessionPhase};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Response to every mutating session request
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable outcome for the status line
    pub status: String,
    pub session: SessionView,
    /// Non-fatal problem the operator should know about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl StatusResponse {
    pub(crate) fn new(status: impl Into<String>, controller: &SessionController) -> Self {
        Self {
            status: status.into(),
            session: controller.view(),
            warning: None,
        }
    }
}

/// GET /api/session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    let controller = state.session.lock().await;
    Json(controller.view())
}

/// Span submission
#[derive(Debug, Deserialize)]
pub struct SpanRequest {
    /// Exact substring of the target text
    pub text: String,
    pub severity: Severity,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Free-text qualifier for "Other" labels
    #[serde(default)]
    pub other: Option<String>,
    /// Operator's corrected wording
    #[serde(default)]
    pub correction: Option<String>,
}

impl SpanRequest {
    fn category(&self) -> ErrorCategory {
        let mut category = ErrorCategory::new(self.category.trim());
        if let Some(sub) = self.subcategory.as_deref().filter(|s| !s.trim().is_empty()) {
            category = category.with_subcategory(sub.trim());
        }
        if let Some(other) = &self.other {
            category = category.with_other(other.as_str());
        }
        category
    }
}

#[derive(Debug, Serialize)]
pub struct SpanResponse {
    pub status: String,
    pub span: ErrorSpan,
    pub session: SessionView,
}

/// POST /api/spans
pub async fn add_span(
    State(state): State<AppState>,
    Json(request): Json<SpanRequest>,
) -> ApiResult<Json<SpanResponse>> {
    let mut controller = state.session.lock().await;
    let span = controller.record_span(
        &request.text,
        request.severity,
        request.category(),
        request.correction.clone(),
    )?;

    Ok(Json(SpanResponse {
        status: format!(
            "Annotation added: \"{}\" [{}] {}",
            span.text,
            span.category.label(),
            span.severity
        ),
        span,
        session: controller.view(),
    }))
}

/// POST /api/mark-correct
pub async fn mark_correct(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let mut controller = state.session.lock().await;
    controller.mark_all_correct()?;
    Ok(Json(StatusResponse::new(
        "Item marked as fully correct",
        &controller,
    )))
}

/// POST /api/mark-unusable
pub async fn mark_unusable(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let mut controller = state.session.lock().await;
    controller.mark_unusable()?;
    Ok(Json(StatusResponse::new(
        "Item marked as unusable (non-translation)",
        &controller,
    )))
}

/// Score submission
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub score: i64,
    /// Overrides the selected rater for this item only
    #[serde(default)]
    pub rater: Option<String>,
}

/// POST /api/advance
pub async fn advance(
    State(state): State<AppState>,
    Json(request): Json<AdvanceRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let score = u32::try_from(request.score)
        .map_err(|_| ApiError::BadRequest(format!("Score {} outside 0-100", request.score)))?;
    let rater = match request.rater.as_deref() {
        Some(name) => state.roster.resolve(name)?,
        None => state.selected_rater.read().await.clone(),
    };

    let response = state
        .with_session_blocking(move |controller| {
            let outcome = controller.advance(score, rater)?;

            let status = match outcome.phase {
                SessionPhase::Completed => "Annotation saved, end of dataset reached".to_string(),
                SessionPhase::AwaitingItem => format!(
                    "Annotation saved for item {}, continue with the next item",
                    outcome.record.id
                ),
            };

            let mut response = StatusResponse::new(status, controller);
            response.warning = outcome.score_warning;
            Ok(response)
        })
        .await?;
    Ok(Json(response))
}

/// Jump target
#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub id: ItemId,
}

/// POST /api/jump
pub async fn jump(
    State(state): State<AppState>,
    Json(request): Json<JumpRequest>,
) -> ApiResult<Json<StatusResponse>> {
    // Ids typed into a text box arrive as strings
    let id = match request.id {
        ItemId::Text(raw) => ItemId::parse(&raw),
        id => id,
    };

    let mut controller = state.session.lock().await;
    controller.jump_to_id(&id)?;

    Ok(Json(StatusResponse::new(
        format!("Jumped to item {}", id),
        &controller,
    )))
}
