//! Marker glyphs
//!
//! Procedurally drawn marker images plus the pixel operations needed to put
//! them on a target: rotation about the glyph center and alpha blending.

use image::{Rgba, RgbaImage};

/// Fill color of the marker disc
const MARKER_FILL: Rgba<u8> = Rgba([229, 57, 53, 255]);
/// Ring around the marker disc
const MARKER_OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 255]);
/// View cone of directional markers
const VIEW_CONE_FILL: Rgba<u8> = Rgba([33, 150, 243, 150]);

const PLAIN_SIZE: u32 = 28;
const PLAIN_RADIUS: f32 = 11.0;
const VIEW_SIZE: u32 = 56;
const VIEW_RADIUS: f32 = 9.0;
const VIEW_CONE_RADIUS: f32 = 26.0;
const VIEW_CONE_HALF_ANGLE: f32 = std::f32::consts::FRAC_PI_6;
const OUTLINE_WIDTH: f32 = 2.0;

/// Non-rotated marker: an outlined disc
pub fn plain_marker() -> RgbaImage {
    let mut image = RgbaImage::new(PLAIN_SIZE, PLAIN_SIZE);
    draw_disc(&mut image, PLAIN_RADIUS);
    image
}

/// Directional marker: a view cone pointing up over an outlined disc.
///
/// Rotating the glyph clockwise by the marker angle points the cone.
pub fn view_marker() -> RgbaImage {
    let mut image = RgbaImage::new(VIEW_SIZE, VIEW_SIZE);
    let (cx, cy) = center(&image);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > VIEW_CONE_RADIUS || distance < 0.5 {
            continue;
        }
        // Angle away from straight up (negative y)
        let off_axis = dx.atan2(-dy).abs();
        let edge = (VIEW_CONE_HALF_ANGLE - off_axis) * distance;
        let coverage = (edge + 0.5).clamp(0.0, 1.0) * (VIEW_CONE_RADIUS - distance + 0.5).clamp(0.0, 1.0);
        if coverage > 0.0 {
            *pixel = with_coverage(VIEW_CONE_FILL, coverage);
        }
    }

    draw_disc(&mut image, VIEW_RADIUS);
    image
}

fn center(image: &RgbaImage) -> (f32, f32) {
    (image.width() as f32 / 2.0, image.height() as f32 / 2.0)
}

/// Anti-aliased disc with a white ring, centered in `image`
fn draw_disc(image: &mut RgbaImage, radius: f32) {
    let (cx, cy) = center(image);
    let inner = radius - OUTLINE_WIDTH;

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let distance = (dx * dx + dy * dy).sqrt();

        let outer_coverage = (radius - distance + 0.5).clamp(0.0, 1.0);
        if outer_coverage <= 0.0 {
            continue;
        }
        let fill_coverage = (inner - distance + 0.5).clamp(0.0, 1.0);

        let ring = with_coverage(MARKER_OUTLINE, outer_coverage);
        let mut color = blend_pixels(*pixel, ring);
        if fill_coverage > 0.0 {
            color = blend_pixels(color, with_coverage(MARKER_FILL, fill_coverage));
        }
        *pixel = color;
    }
}

fn with_coverage(color: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let alpha = (color[3] as f32 * coverage).round().clamp(0.0, 255.0) as u8;
    Rgba([color[0], color[1], color[2], alpha])
}

/// Rotate an image clockwise by `radians` about its center.
///
/// The canvas grows to the rotated bounding box and stays centered, so the
/// glyph anchor remains the image center.
pub fn rotate(image: &RgbaImage, radians: f32) -> RgbaImage {
    let cos = radians.cos();
    let sin = radians.sin();

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    // The small bias keeps float noise at right angles from adding a pixel
    let dst_w = (src_w * cos.abs() + src_h * sin.abs() - 1e-3).ceil().max(1.0) as u32;
    let dst_h = (src_w * sin.abs() + src_h * cos.abs() - 1e-3).ceil().max(1.0) as u32;
    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Inverse rotation maps each destination pixel back into the source
            let rx = dx as f32 + 0.5 - dst_cx;
            let ry = dy as f32 + 0.5 - dst_cy;
            let sx = rx * cos + ry * sin + cx - 0.5;
            let sy = -rx * sin + ry * cos + cy - 0.5;

            if let Some(pixel) = sample_bilinear(image, sx, sy) {
                rotated.put_pixel(dx, dy, pixel);
            }
        }
    }

    rotated
}

fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> Option<Rgba<u8>> {
    let max_x = image.width() as f32 - 1.0;
    let max_y = image.height() as f32 - 1.0;
    if sx < 0.0 || sy < 0.0 || sx > max_x || sy > max_y {
        return None;
    }

    let x0 = sx.floor() as u32;
    let y0 = sy.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let interpolate = |c: usize| -> u8 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
        v.round().clamp(0.0, 255.0) as u8
    };

    Some(Rgba([
        interpolate(0),
        interpolate(1),
        interpolate(2),
        interpolate(3),
    ]))
}

/// Blend `overlay` onto `target` with its center at (`center_x`, `center_y`).
///
/// Parts falling outside the target are clipped.
pub fn blend_centered(target: &mut RgbaImage, overlay: &RgbaImage, center_x: f32, center_y: f32) {
    let origin_x = (center_x - overlay.width() as f32 / 2.0).round() as i64;
    let origin_y = (center_y - overlay.height() as f32 / 2.0).round() as i64;

    let target_width = target.width() as i64;
    let target_height = target.height() as i64;

    let x_start = origin_x.max(0);
    let y_start = origin_y.max(0);
    let x_end = (origin_x + overlay.width() as i64).min(target_width);
    let y_end = (origin_y + overlay.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let overlay_pixel = overlay.get_pixel((tx - origin_x) as u32, (ty - origin_y) as u32);
            if overlay_pixel[3] == 0 {
                continue;
            }
            let target_pixel = target.get_pixel(tx as u32, ty as u32);
            let blended = blend_pixels(*target_pixel, *overlay_pixel);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend two pixels with the Porter-Duff "over" operator
pub fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
