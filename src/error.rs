//! Error taxonomy for the ingestion, merge and search pipeline.

use axum::http::StatusCode;
use std::path::PathBuf;

pub type DocResult<T> = std::result::Result<T, DocError>;

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Unsupported file type: {extension}. Supported types: {supported:?}")]
    UnsupportedFormat {
        extension: String,
        supported: Vec<&'static str>,
    },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Embedding provider failed: {0}")]
    Embedding(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No indexes found to merge")]
    NoDocuments,

    #[error("No vectors found to merge")]
    EmptyCorpus,

    #[error("Merged index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Merged index is inconsistent: {0}")]
    MergeCorruption(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl DocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocError::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP status reported at the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocError::UnsupportedFormat { .. } | DocError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            DocError::FileNotFound(_) | DocError::NoDocuments | DocError::IndexNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DocError::DimensionMismatch { .. } | DocError::EmptyCorpus | DocError::Load { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DocError::Embedding(_) => StatusCode::BAD_GATEWAY,
            DocError::MergeCorruption(_)
            | DocError::Catalog(_)
            | DocError::Io { .. }
            | DocError::Serialization(_)
            | DocError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for DocError {
    fn from(e: serde_json::Error) -> Self {
        DocError::Serialization(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for DocError {
    fn from(e: bincode::error::EncodeError) -> Self {
        DocError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for DocError {
    fn from(e: bincode::error::DecodeError) -> Self {
        DocError::Serialization(e.to_string())
    }
}

impl From<DocError> for (StatusCode, String) {
    fn from(e: DocError) -> Self {
        (e.status_code(), e.to_string())
    }
}
