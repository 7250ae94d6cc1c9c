//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Layer errors never cross
//! the pipeline boundary; they are caught at the layer wrapper and
//! recorded as failure markers on the layer's output.

use thiserror::Error;

/// Errors raised by the document-access collaborator.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document snapshot is gone or was never rendered
    #[error("document unavailable: {0}")]
    Unavailable(String),

    /// A structural selector could not be evaluated
    #[error("bad selector: {0}")]
    BadSelector(String),

    /// Reading document content failed
    #[error("document read error: {0}")]
    Io(String),
}

/// Errors raised by the image-text recognition collaborator.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// Recognizer backend is not reachable
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),

    /// Recognition ran but failed on this image
    #[error("recognition failed: {0}")]
    Failed(String),
}

/// Errors internal to a single layer invocation.
///
/// These are caught by the layer runner and converted into a
/// `LayerFailure` marker; they never abort an extraction session.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Document access failed mid-extraction
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Image-text recognition failed
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),

    /// Embedded payload could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for LayerError {
    fn from(e: serde_json::Error) -> Self {
        LayerError::Parse(e.to_string())
    }
}

/// Result type alias for layer operations.
pub type LayerResult<T> = std::result::Result<T, LayerError>;

/// Result type alias for document operations.
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Result type alias for recognizer operations.
pub type RecognizerResult<T> = std::result::Result<T, RecognizerError>;
