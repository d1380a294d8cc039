//! Output format selection
//!
//! Artifacts are always encoded in the format named by the source path's
//! extension. Only JPEG and PNG have encoders.

use crate::error::PipelineError;

/// Encodable output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Select the output format for a lowercase file extension
    pub fn from_extension(ext: &str) -> Result<Self, PipelineError> {
        match ext {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "" => Err(PipelineError::UnsupportedFormat(
                "source path has no extension".to_string(),
            )),
            other => Err(PipelineError::UnsupportedFormat(other.to_string())),
        }
    }

    /// MIME type for this format
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// MIME type for a served file, derived from its logical path.
///
/// Covers the formats originals may be stored in, so pass-through responses
/// carry a sensible type too.
pub fn content_type_for_path(path: &str) -> &'static str {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
