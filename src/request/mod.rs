//! Transform request model
//!
//! A [`TransformRequest`] is the immutable description of one resize
//! operation: which source image, the target size, the crop box, the optional
//! margin crop, the coordinate space of the crop box and the markers to draw.
//! Every field participates in the cache key.

pub mod params;

pub use params::{parse_points, parse_query_string};

use std::path::Path;

/// Coordinate space of crop rectangles and marker points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateMode {
    /// Absolute pixel coordinates; `x`/`y` name the top-left corner
    #[default]
    AbsolutePixels,
    /// Fractions of the resized image; `x`/`y` name the crop-box center
    NormalizedUv,
}

impl CoordinateMode {
    pub fn is_uv(&self) -> bool {
        matches!(self, CoordinateMode::NormalizedUv)
    }
}

/// Raw crop rectangle as received from the client
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Both extents are non-zero
    pub fn is_requested(&self) -> bool {
        self.width != 0.0 && self.height != 0.0
    }
}

/// Secondary resize applied to the cropped region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginCrop {
    pub width: u32,
    pub height: u32,
}

/// Labeled overlay marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPoint {
    pub x: f64,
    pub y: f64,
    /// Rotation in radians; `Some` selects the directional glyph
    pub angle: Option<f64>,
    pub number: i64,
}

impl MarkerPoint {
    pub fn new(x: f64, y: f64, number: i64) -> Self {
        Self {
            x,
            y,
            angle: None,
            number,
        }
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }
}

/// One image transformation request
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    source_path: String,
    target_width: u32,
    target_height: u32,
    crop: CropRect,
    margin: Option<MarginCrop>,
    mode: CoordinateMode,
    markers: Vec<MarkerPoint>,
}

impl TransformRequest {
    /// Create a parameter-less request for `source_path`.
    ///
    /// The path is sanitized immediately so nothing downstream ever sees a
    /// traversal sequence.
    pub fn new(source_path: &str) -> Self {
        Self {
            source_path: sanitize_path(source_path),
            target_width: 0,
            target_height: 0,
            crop: CropRect::default(),
            margin: None,
            mode: CoordinateMode::AbsolutePixels,
            markers: Vec::new(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = crop;
        self
    }

    /// Margin crop of `0x0` means "none"
    pub fn with_margin(mut self, width: u32, height: u32) -> Self {
        self.margin = if width == 0 && height == 0 {
            None
        } else {
            Some(MarginCrop { width, height })
        };
        self
    }

    pub fn with_mode(mut self, mode: CoordinateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_markers(mut self, markers: Vec<MarkerPoint>) -> Self {
        self.markers = markers;
        self
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn crop(&self) -> &CropRect {
        &self.crop
    }

    pub fn margin(&self) -> Option<MarginCrop> {
        self.margin
    }

    pub fn mode(&self) -> CoordinateMode {
        self.mode
    }

    pub fn markers(&self) -> &[MarkerPoint] {
        &self.markers
    }

    /// Lowercased extension of the source path, without the dot
    pub fn extension(&self) -> String {
        Path::new(&self.source_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// True when the request asks for any resize, crop or margin crop
    pub fn has_geometry(&self) -> bool {
        self.target_width != 0
            || self.target_height != 0
            || self.crop.width != 0.0
            || self.crop.height != 0.0
            || self.margin.is_some()
    }

    /// True when the original file can be served untouched
    pub fn is_passthrough(&self) -> bool {
        !self.has_geometry() && self.markers.is_empty()
    }
}

/// Strip parent- and current-directory segments from a logical path.
///
/// Backslashes count as separators. Empty, `.` and `..` segments are dropped
/// along with leading slashes, so the result can always be joined under a
/// storage root.
pub fn sanitize_path(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}
