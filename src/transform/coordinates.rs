//! Coordinate resolution
//!
//! Converts a request's raw crop box into an absolute pixel rectangle on the
//! resized image. In UV mode the box is expressed as fractions of the
//! *post-resize* dimensions and `x`/`y` name its center.
//!
//! All arithmetic is `f64`; the only rounding is the final truncation toward
//! zero, so the same request always yields the same rectangle.

use crate::request::{CoordinateMode, CropRect};

/// Absolute crop rectangle in pixels.
///
/// Components are signed: a UV box centered near an edge resolves to a
/// negative origin, which the engine rejects as out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with a zero extent means "no crop"
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Rectangle lies entirely within an image of the given size.
    ///
    /// Extents that overflow `i64` never fit.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && matches!(right, Some(r) if r <= width as i64)
            && matches!(bottom, Some(b) if b <= height as i64)
    }
}

/// Dimensions of the image after the primary resize, before truncation.
///
/// A zero target leaves that axis unconstrained and preserves the aspect
/// ratio from the other axis; no targets at all means no resize.
pub fn effective_dimensions(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> (f64, f64) {
    let sw = source_width as f64;
    let sh = source_height as f64;
    let tw = target_width as f64;
    let th = target_height as f64;

    match (target_width, target_height) {
        (0, 0) => (sw, sh),
        (_, 0) => (tw, sh * (tw / sw)),
        (0, _) => (sw * (th / sh), th),
        _ => (tw, th),
    }
}

/// Resolve a raw crop box into an absolute pixel rectangle.
pub fn resolve(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
    raw: &CropRect,
    mode: CoordinateMode,
) -> PixelRect {
    match mode {
        CoordinateMode::AbsolutePixels => PixelRect::new(
            truncate(raw.x),
            truncate(raw.y),
            truncate(raw.width),
            truncate(raw.height),
        ),
        CoordinateMode::NormalizedUv => {
            let (ew, eh) =
                effective_dimensions(source_width, source_height, target_width, target_height);
            let width = raw.width * ew;
            let height = raw.height * eh;
            let x = raw.x * ew - width / 2.0;
            let y = raw.y * eh - height / 2.0;
            PixelRect::new(truncate(x), truncate(y), truncate(width), truncate(height))
        }
    }
}

/// Truncate toward zero; non-finite input collapses to zero
fn truncate(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}
