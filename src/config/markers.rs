//! Marker overlay configuration types.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MARKER_FONT_SIZE;

fn default_font_size() -> f32 {
    DEFAULT_MARKER_FONT_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// TrueType font for labels; the embedded font is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<String>,
    /// Label size in pixels (default: 16)
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// PNG replacing the plain marker glyph
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_image: Option<String>,
    /// PNG replacing the directional marker glyph; drawn pointing up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_view_image: Option<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: default_font_size(),
            marker_image: None,
            marker_view_image: None,
        }
    }
}
