//! mqm-ui library - MQM annotation workbench service
//!
//! HTTP front end over the annotation session: dataset selection, span
//! entry, scoring, output listing/download and output mirroring.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use mqm_common::dataset::DatasetCatalog;
use mqm_common::models::Rater;
use mqm_common::raters::RaterRoster;
use mqm_common::SessionController;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod sync;

pub use error::{ApiError, ApiResult};

use sync::MirrorSync;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Single session; the mutex serializes every transition
    pub session: Arc<Mutex<SessionController>>,
    pub roster: Arc<RaterRoster>,
    pub catalog: Arc<DatasetCatalog>,
    /// Folder the record writer appends into
    pub output_dir: PathBuf,
    /// Rater used when an advance request names none
    pub selected_rater: Arc<RwLock<Rater>>,
    /// Output mirroring, when configured
    pub sync: Option<Arc<MirrorSync>>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        session: SessionController,
        roster: RaterRoster,
        catalog: DatasetCatalog,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let selected = roster.default_rater().clone();
        Self {
            session: Arc::new(Mutex::new(session)),
            roster: Arc::new(roster),
            catalog: Arc::new(catalog),
            output_dir: output_dir.into(),
            selected_rater: Arc::new(RwLock::new(selected)),
            sync: None,
        }
    }

    pub fn with_sync(mut self, sync: MirrorSync) -> Self {
        self.sync = Some(Arc::new(sync));
        self
    }

    /// Run a session command on a blocking thread
    ///
    /// For commands that read datasets or append records. The session lock
    /// is held until the command returns, so transitions stay serialized.
    pub async fn with_session_blocking<T, F>(&self, command: F) -> ApiResult<T>
    where
        F: FnOnce(&mut SessionController) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut controller = Arc::clone(&self.session).lock_owned().await;
        tokio::task::spawn_blocking(move || command(&mut controller))
            .await
            .map_err(|e| ApiError::Internal(format!("Session task failed: {}", e)))?
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let session = Router::new()
        .route("/api/session", get(api::get_session))
        .route("/api/spans", post(api::add_span))
        .route("/api/mark-correct", post(api::mark_correct))
        .route("/api/mark-unusable", post(api::mark_unusable))
        .route("/api/advance", post(api::advance))
        .route("/api/jump", post(api::jump));

    let selection = Router::new()
        .route("/api/categories", get(api::list_categories))
        .route("/api/raters", get(api::list_raters))
        .route("/api/rater", post(api::select_rater))
        .route("/api/datasets", get(api::list_datasets))
        .route("/api/dataset", post(api::select_dataset));

    let outputs = Router::new()
        .route("/api/outputs", get(api::list_outputs))
        .route("/api/outputs/:name", get(api::download_output))
        .route("/api/sync", post(api::trigger_sync));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(session)
        .merge(selection)
        .merge(outputs)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
