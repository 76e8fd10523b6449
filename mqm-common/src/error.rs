//! Common error types for the MQM annotation workbench

use thiserror::Error;

/// Common result type for annotation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the session core and the service layer
///
/// Every variant except `Io` leaves the session in its last-known-good
/// configuration; callers surface the message and let the operator retry.
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset file missing, malformed, empty or lacking required columns
    #[error("Dataset load error: {0}")]
    DataLoad(String),

    /// Position past the end of the loaded dataset
    #[error("Position {position} out of range (dataset has {len} items)")]
    OutOfRange { position: usize, len: usize },

    /// Requested item identifier or file not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Submitted error text does not occur in the translation
    #[error("Error span \"{span}\" not found in translation text")]
    SpanNotFound { span: String },

    /// Appending to an output store failed; nothing was committed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Command not valid in the current session phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Command contradicts the classification already recorded for the item
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No dataset has been selected yet
    #[error("No dataset loaded")]
    NoDataset,

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any displayable failure from an output store
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Error::Persistence(err.to_string())
    }
}
