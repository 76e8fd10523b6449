//! # MQM Common Library
//!
//! Annotation core shared by the workbench service:
//! - Data model (items, error spans, annotation records)
//! - MQM category taxonomy and rater roster
//! - Dataset Store and dataset catalog
//! - Annotation Accumulator and Session Controller
//! - Append-only Record Writer
//! - Configuration loading

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod raters;
pub mod session;
pub mod taxonomy;
pub mod writer;

pub use error::{Error, Result};
pub use session::{SessionController, SessionPhase};
