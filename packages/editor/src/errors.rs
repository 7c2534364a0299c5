//! Error types for the editor

use thiserror::Error;
use wavekit_document::DocumentError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Markup pattern error: {0}")]
    Markup(#[from] regex::Error),

    #[error("Illegal inline blip position: {0}. Position has to be greater than 0")]
    InvalidPosition(i64),

    #[error("Invalid proxy id: '{0}'")]
    InvalidProxyId(String),

    #[error("Unknown blip: {0}")]
    UnknownBlip(String),

    #[error("Selection has no matches")]
    NoMatch,

    #[error("No values supplied for a selection with matches")]
    EmptyPayload,

    #[error("Cannot mix text and elements in one batch")]
    MixedContent,
}

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
