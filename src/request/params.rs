//! Request parameter parsing
//!
//! Turns the route segments and query string of a transform request into a
//! [`TransformRequest`]:
//!
//! ```text
//! /{width}/{height}/{image path}?cx=..&cy=..&cw=..&ch=..&cmw=..&cmh=..&uv=1&points=x_y_n[_angle],...
//! ```

use std::collections::HashMap;

use super::{CoordinateMode, CropRect, MarkerPoint, TransformRequest};
use crate::error::PipelineError;

/// Query keys that carry crop geometry
const CROP_PARAMS: [&str; 4] = ["cx", "cy", "cw", "ch"];

/// Split a raw query string into decoded key/value pairs.
///
/// Later occurrences of a key win. Keys without `=` map to an empty value.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = decode_component(value);
        params.insert(key, value);
    }

    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Parse the `points` query value.
///
/// Tuples are separated by commas, fields by underscores:
/// `x_y_number` draws a plain marker, `x_y_number_angle` a directional one.
/// Tuples with fewer than three fields or with non-numeric fields are
/// skipped.
pub fn parse_points(query: &str) -> Vec<MarkerPoint> {
    query
        .split(',')
        .filter_map(|tuple| {
            let point = parse_point(tuple);
            if point.is_none() && !tuple.is_empty() {
                tracing::debug!(tuple = %tuple, "Skipping malformed marker tuple");
            }
            point
        })
        .collect()
}

fn parse_point(tuple: &str) -> Option<MarkerPoint> {
    let fields: Vec<&str> = tuple.split('_').collect();
    if fields.len() < 3 {
        return None;
    }

    let x: f64 = fields[0].trim().parse().ok()?;
    let y: f64 = fields[1].trim().parse().ok()?;
    let number: i64 = fields[2].trim().parse().ok()?;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    let mut point = MarkerPoint::new(x, y, number);
    if let Some(angle) = fields.get(3) {
        let angle: f64 = angle.trim().parse().ok()?;
        if !angle.is_finite() {
            return None;
        }
        point = point.with_angle(angle);
    }

    Some(point)
}

impl TransformRequest {
    /// Build a request from route segments and decoded query parameters.
    ///
    /// Absent parameters default to zero. Present but malformed numeric
    /// values are rejected with [`PipelineError::InvalidParameter`].
    pub fn from_route(
        image_path: &str,
        width: &str,
        height: &str,
        query: &HashMap<String, String>,
    ) -> Result<Self, PipelineError> {
        let width = parse_dimension("width", width)?;
        let height = parse_dimension("height", height)?;

        let mode = match query.get("uv").map(|v| v.trim()) {
            None | Some("") | Some("0") | Some("false") => CoordinateMode::AbsolutePixels,
            Some("1") | Some("true") => CoordinateMode::NormalizedUv,
            Some(other) => {
                return Err(PipelineError::invalid_param(
                    "uv",
                    format!("expected 0 or 1, got '{}'", other),
                ))
            }
        };

        let mut crop = [0.0f64; 4];
        for (slot, name) in crop.iter_mut().zip(CROP_PARAMS) {
            *slot = parse_coordinate(name, query.get(name))?;
        }

        let margin_width = match query.get("cmw") {
            Some(value) => parse_dimension("cmw", value)?,
            None => 0,
        };
        let margin_height = match query.get("cmh") {
            Some(value) => parse_dimension("cmh", value)?,
            None => 0,
        };

        let markers = query
            .get("points")
            .map(|p| parse_points(p))
            .unwrap_or_default();

        Ok(TransformRequest::new(image_path)
            .with_size(width, height)
            .with_crop(CropRect::new(crop[0], crop[1], crop[2], crop[3]))
            .with_margin(margin_width, margin_height)
            .with_mode(mode)
            .with_markers(markers))
    }
}

fn parse_dimension(name: &str, value: &str) -> Result<u32, PipelineError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<u32>()
        .map_err(|_| PipelineError::invalid_param(name, "must be a non-negative integer"))
}

fn parse_coordinate(name: &str, value: Option<&String>) -> Result<f64, PipelineError> {
    let Some(value) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return Ok(0.0);
    };
    let parsed: f64 = value
        .parse()
        .map_err(|_| PipelineError::invalid_param(name, "must be a number"))?;
    if !parsed.is_finite() {
        return Err(PipelineError::invalid_param(name, "must be finite"));
    }
    Ok(parsed)
}
