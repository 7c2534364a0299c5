//! Error types for the document model

use thiserror::Error;

/// Failures raised by document range operations.
///
/// All of them are synchronous and leave the document untouched when they
/// are returned from a validating entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Range [{start}, {end}) is outside a document of length {len}")]
    OutOfRange { start: i64, end: i64, len: usize },

    #[error("No element found at index {0}")]
    NoElementAtPosition(usize),

    #[error("Unexpected modify action: {0}")]
    InvalidAction(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl DocumentError {
    pub(crate) fn out_of_range(start: i64, end: i64, len: usize) -> Self {
        DocumentError::OutOfRange { start, end, len }
    }
}

/// Result type alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;
