//! Cache key derivation
//!
//! Every field of a [`TransformRequest`] is written into a canonical string
//! which is then hashed with SHA-256. Floats use Rust's shortest round-trip
//! `Display`, so distinct values never print the same.

use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};

use crate::constants::CACHE_FILE_EXTENSION;
use crate::request::{CoordinateMode, TransformRequest};

/// Fixed-length hex digest identifying one transform request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &TransformRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical_string(request).as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Artifact file name, e.g. `3fa2...9c.cache`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, CACHE_FILE_EXTENSION)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical text form of a request.
///
/// Fields appear in a fixed order with explicit labels; the marker list is
/// length-prefixed and the source path comes last, so no two requests share
/// a canonical form.
pub fn canonical_string(request: &TransformRequest) -> String {
    let mut out = String::with_capacity(128);

    let mode = match request.mode() {
        CoordinateMode::AbsolutePixels => "px",
        CoordinateMode::NormalizedUv => "uv",
    };
    let crop = request.crop();

    // Writing to a String cannot fail
    let _ = write!(
        out,
        "mode={}|w={}|h={}|crop={},{},{},{}|",
        mode,
        request.target_width(),
        request.target_height(),
        crop.x,
        crop.y,
        crop.width,
        crop.height
    );

    match request.margin() {
        Some(margin) => {
            let _ = write!(out, "margin={}x{}|", margin.width, margin.height);
        }
        None => out.push_str("margin=none|"),
    }

    let _ = write!(out, "markers={}:", request.markers().len());
    for marker in request.markers() {
        let _ = write!(out, "{}_{}_{}_", marker.x, marker.y, marker.number);
        match marker.angle {
            Some(angle) => {
                let _ = write!(out, "{};", angle);
            }
            None => out.push_str("none;"),
        }
    }

    let _ = write!(out, "|path={}", request.source_path());
    out
}
