//! HTTP API handlers for mqm-ui

pub mod buildinfo;
pub mod catalog;
pub mod health;
pub mod outputs;
pub mod session;
pub mod ui;

pub use buildinfo::get_build_info;
pub use catalog::{list_categories, list_datasets, list_raters, select_dataset, select_rater};
pub use health::health_routes;
pub use outputs::{download_output, list_outputs, trigger_sync};
pub use session::{add_span, advance, get_session, jump, mark_correct, mark_unusable};
pub use ui::{serve_app_js, serve_index};
