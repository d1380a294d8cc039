//! Marker overlays
//!
//! Draws numbered markers onto an output image. A marker without an angle is
//! drawn upright with its label centered above it; a marker with an angle has
//! its directional glyph rotated about the marker point while the label stays
//! upright.

use image::{DynamicImage, RgbaImage};
use thiserror::Error;

pub mod glyph;
pub mod label;

pub use label::{LabelFont, LABEL_COLOR};

use crate::config::MarkerConfig;
use crate::constants::{DEFAULT_MARKER_FONT_SIZE, MARKER_LABEL_OFFSET, MARKER_VIEW_LABEL_OFFSET};
use crate::request::{CoordinateMode, MarkerPoint};

/// Startup errors while loading marker assets
#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("failed to load label font: {0}")]
    Font(String),

    #[error("failed to load marker image {path}: {message}")]
    Glyph { path: String, message: String },
}

pub struct MarkerCompositor {
    plain: RgbaImage,
    view: RgbaImage,
    font: LabelFont,
    font_size: f32,
}

impl std::fmt::Debug for MarkerCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerCompositor")
            .field("font_size", &self.font_size)
            .finish()
    }
}

impl MarkerCompositor {
    /// Compositor with the built-in glyphs
    pub fn new(font: LabelFont, font_size: f32) -> Self {
        Self {
            plain: glyph::plain_marker(),
            view: glyph::view_marker(),
            font,
            font_size,
        }
    }

    /// Load glyph overrides and the label font named by the configuration.
    ///
    /// A configured asset that cannot be loaded is an error. Without a
    /// configured font the embedded one is used.
    pub fn from_config(config: &MarkerConfig) -> Result<Self, MarkerError> {
        let font = match &config.font_path {
            Some(path) => {
                tracing::debug!(font = %path, "Using configured font for marker labels");
                LabelFont::load(path)?
            }
            None => LabelFont::embedded(),
        };

        let mut compositor = Self::new(font, config.font_size);
        if let Some(path) = &config.marker_image {
            compositor.plain = load_glyph(path)?;
        }
        if let Some(path) = &config.marker_view_image {
            compositor.view = load_glyph(path)?;
        }
        Ok(compositor)
    }

    /// Draw `markers` onto `image`.
    ///
    /// In UV mode marker coordinates are fractions of the image's current
    /// size.
    pub fn composite_image(&self, image: &mut RgbaImage, markers: &[MarkerPoint], mode: CoordinateMode) {
        let (width, height) = (image.width() as f64, image.height() as f64);

        for marker in markers {
            let (x, y) = if mode.is_uv() {
                (marker.x * width, marker.y * height)
            } else {
                (marker.x, marker.y)
            };
            let (x, y) = (x as f32, y as f32);

            let label_offset = match marker.angle {
                None => {
                    glyph::blend_centered(image, &self.plain, x, y);
                    MARKER_LABEL_OFFSET
                }
                Some(angle) => {
                    let rotated = glyph::rotate(&self.view, angle as f32);
                    glyph::blend_centered(image, &rotated, x, y);
                    MARKER_VIEW_LABEL_OFFSET
                }
            };

            self.font.draw_centered(
                image,
                &marker.number.to_string(),
                self.font_size,
                x,
                y - label_offset,
                LABEL_COLOR,
            );
        }
    }

    /// Owned-image convenience over [`composite_image`](Self::composite_image)
    pub fn composite(&self, image: DynamicImage, markers: &[MarkerPoint], mode: CoordinateMode) -> DynamicImage {
        if markers.is_empty() {
            return image;
        }
        let mut canvas = image.into_rgba8();
        self.composite_image(&mut canvas, markers, mode);
        DynamicImage::ImageRgba8(canvas)
    }
}

impl Default for MarkerCompositor {
    fn default() -> Self {
        Self::new(LabelFont::embedded(), DEFAULT_MARKER_FONT_SIZE)
    }
}

fn load_glyph(path: &str) -> Result<RgbaImage, MarkerError> {
    image::open(path)
        .map(|img| img.into_rgba8())
        .map_err(|e| MarkerError::Glyph {
            path: path.to_string(),
            message: e.to_string(),
        })
}
