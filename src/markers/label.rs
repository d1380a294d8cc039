//! Marker labels
//!
//! Renders a marker's number with a TrueType font, centered on a point.
//!
//! DejaVu Sans Mono is compiled into the binary so labels render the same on
//! every host; a configured font file replaces it.

use ab_glyph::{Font, FontArc, PxScale, Rect, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::OnceLock;

use super::glyph::blend_pixels;
use super::MarkerError;

/// Label text color
pub const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Embedded label font (DejaVu Sans Mono, see fonts/LICENSE)
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

static EMBEDDED_FONT: OnceLock<FontArc> = OnceLock::new();

/// Font used for marker labels
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont").finish_non_exhaustive()
    }
}

impl LabelFont {
    /// The font compiled into the binary
    pub fn embedded() -> Self {
        let font = EMBEDDED_FONT.get_or_init(|| {
            FontArc::try_from_slice(EMBEDDED_FONT_DATA)
                .expect("Failed to load embedded font - this is a bug")
        });
        Self { font: font.clone() }
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, MarkerError> {
        let font = FontArc::try_from_vec(data)
            .map_err(|e| MarkerError::Font(format!("invalid font data: {}", e)))?;
        Ok(Self { font })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MarkerError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| MarkerError::Font(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }

    /// Draw `text` so its ink bounds are centered on (`center_x`, `center_y`)
    pub fn draw_centered(
        &self,
        target: &mut RgbaImage,
        text: &str,
        size: f32,
        center_x: f32,
        center_y: f32,
        color: Rgba<u8>,
    ) {
        let scale = PxScale::from(size);
        let scaled_font = self.font.as_scaled(scale);

        // Lay out on a zero baseline first
        let mut outlines = Vec::new();
        let mut cursor_x = 0.0f32;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;
        for c in text.chars() {
            let glyph_id = scaled_font.glyph_id(c);
            if let Some(prev) = prev_glyph {
                cursor_x += scaled_font.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, 0.0));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                outlines.push(outlined);
            }
            cursor_x += scaled_font.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        let Some(bounds) = outlines
            .iter()
            .map(|o| o.px_bounds())
            .reduce(union)
        else {
            return;
        };

        let offset_x = (center_x - (bounds.min.x + bounds.max.x) / 2.0).round() as i32;
        let offset_y = (center_y - (bounds.min.y + bounds.max.y) / 2.0).round() as i32;
        let width = target.width() as i32;
        let height = target.height() as i32;

        for outlined in &outlines {
            let glyph_bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + glyph_bounds.min.x as i32 + offset_x;
                let y = py as i32 + glyph_bounds.min.y as i32 + offset_y;

                if x >= 0 && y >= 0 && x < width && y < height {
                    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32) as u8;
                    let pixel = Rgba([color[0], color[1], color[2], alpha]);
                    let existing = *target.get_pixel(x as u32, y as u32);
                    target.put_pixel(x as u32, y as u32, blend_pixels(existing, pixel));
                }
            });
        }
    }
}

fn union(a: Rect, b: Rect) -> Rect {
    Rect {
        min: ab_glyph::point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
        max: ab_glyph::point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
    }
}
