//! Pipeline error taxonomy
//!
//! Every failure on the request path surfaces as a [`PipelineError`], which
//! knows its HTTP-equivalent status and the message that may be shown to
//! clients. Backend- and cache-specific errors convert into it with `From`.

use thiserror::Error;

use crate::cache::CacheError;
use crate::storage::StorageError;

/// Errors produced while resolving a request into a cached artifact
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source image (or cache artifact) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Source bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Output extension has no encoder
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Computed scale factor or crop rectangle is out of range
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Backend transport failure (network, credentials, ...)
    #[error("storage transport error: {0}")]
    StorageTransport(String),

    /// Malformed request parameter
    #[error("invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// Cache directory I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (panicked worker, encoder bug, ...)
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Maps pipeline errors to HTTP status codes
    ///
    /// - NotFound, StorageTransport → 404
    /// - ImageDecode, UnsupportedFormat, InvalidGeometry, InvalidParameter → 400
    /// - Io, Internal → 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            PipelineError::NotFound(_) | PipelineError::StorageTransport(_) => 404,
            PipelineError::ImageDecode(_)
            | PipelineError::UnsupportedFormat(_)
            | PipelineError::InvalidGeometry(_)
            | PipelineError::InvalidParameter { .. } => 400,
            PipelineError::Io(_) | PipelineError::Internal(_) => 500,
        }
    }

    /// Message safe to return to clients.
    ///
    /// Transport failures look like a missing file from the outside; the
    /// underlying detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::NotFound(path) | PipelineError::StorageTransport(path) => {
                format!("File {} not found", path)
            }
            PipelineError::Io(_) | PipelineError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        PipelineError::InvalidGeometry(message.into())
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => PipelineError::NotFound(path),
            StorageError::Transport { path, message } => {
                tracing::warn!(path = %path, error = %message, "Storage backend transport failure");
                PipelineError::StorageTransport(path)
            }
            StorageError::Config(message) => PipelineError::Internal(message),
        }
    }
}

impl From<CacheError> for PipelineError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io(e) => PipelineError::Io(e),
            CacheError::DirectoryUnavailable { path, source } => {
                PipelineError::Internal(format!("cache directory {}: {}", path.display(), source))
            }
        }
    }
}
