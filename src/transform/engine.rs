//! Transform engine
//!
//! Handles the image transformation: decode → clamp → resize → crop →
//! margin crop → encode. Geometry math stays in `f64` and is truncated to
//! pixels only where a resize or crop call needs integers.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::coordinates::{self, PixelRect};
use super::encoder;
use super::format::OutputFormat;
use crate::error::PipelineError;
use crate::request::TransformRequest;

/// Absorbs representation error when a scale is multiplied back out
/// (e.g. `3.0 * (1.0 / 3.0)` must still give 1 pixel)
const SCALE_EPSILON: f64 = 1e-6;

/// Decoded, transformed image ready for encoding
#[derive(Debug)]
pub struct RenderedImage {
    pub image: DynamicImage,
    pub format: OutputFormat,
    /// Source dimensions (width, height)
    pub source_size: (u32, u32),
    /// True when the primary crop was applied
    pub crop_applied: bool,
}

impl RenderedImage {
    pub fn output_size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Transform `source` according to `request` and encode the result.
pub fn transform(source: &[u8], request: &TransformRequest) -> Result<Vec<u8>, PipelineError> {
    let rendered = render(source, request)?;
    encoder::encode(&rendered.image, rendered.format)
}

/// Run every geometry step without encoding.
///
/// The output format is resolved before decoding so unsupported extensions
/// fail without paying for a decode.
pub fn render(source: &[u8], request: &TransformRequest) -> Result<RenderedImage, PipelineError> {
    let format = OutputFormat::from_extension(&request.extension())?;

    // 1. Decode
    let img = decode_image(source)?;
    let (src_width, src_height) = (img.width(), img.height());

    // 2. Downscale-only clamp
    let target_width = clamp_target(request.target_width(), src_width);
    let target_height = clamp_target(request.target_height(), src_height);

    // 3-4. Resize
    let mut img = match plan_scales(src_width, src_height, target_width, target_height)? {
        Some((width_scale, height_scale)) => {
            let dst_width = scaled_extent(src_width, width_scale);
            let dst_height = scaled_extent(src_height, height_scale);
            resize_image(&img, dst_width, dst_height)?
        }
        None => img,
    };

    // 5. Crop
    let rect = coordinates::resolve(
        src_width,
        src_height,
        target_width,
        target_height,
        request.crop(),
        request.mode(),
    );
    let crop_applied = !rect.is_empty();
    if crop_applied {
        img = crop_image(&img, &rect)?;
    }

    // 6. Margin crop
    if let Some(margin) = request.margin().filter(|_| crop_applied) {
        if margin.width as i64 <= rect.width && margin.height as i64 <= rect.height {
            img = apply_margin(img, margin.width, margin.height)?;
        } else {
            tracing::debug!(
                margin_width = margin.width,
                margin_height = margin.height,
                crop_width = rect.width,
                crop_height = rect.height,
                "Margin crop larger than crop box, ignoring"
            );
        }
    }

    Ok(RenderedImage {
        image: img,
        format,
        source_size: (src_width, src_height),
        crop_applied,
    })
}

/// Decode image data into a DynamicImage
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, PipelineError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PipelineError::ImageDecode(e.to_string()))?
        .decode()
        .map_err(|e| PipelineError::ImageDecode(e.to_string()))
}

/// A target larger than the source is treated as unconstrained
fn clamp_target(target: u32, source: u32) -> u32 {
    if target > source {
        0
    } else {
        target
    }
}

/// Compute independent X/Y scale factors.
///
/// A zero target borrows the other axis' scale; both zero means no resize.
fn plan_scales(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
) -> Result<Option<(f64, f64)>, PipelineError> {
    if target_width == 0 && target_height == 0 {
        return Ok(None);
    }

    let mut width_scale = target_width as f64 / src_width as f64;
    let mut height_scale = target_height as f64 / src_height as f64;
    if target_width == 0 {
        width_scale = height_scale;
    }
    if target_height == 0 {
        height_scale = width_scale;
    }

    validate_scale(width_scale)?;
    validate_scale(height_scale)?;
    Ok(Some((width_scale, height_scale)))
}

fn validate_scale(scale: f64) -> Result<(), PipelineError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::invalid_geometry(format!(
            "scale factor {} is out of range",
            scale
        )))
    }
}

/// Pixel extent after scaling, truncated, never below one pixel
fn scaled_extent(extent: u32, scale: f64) -> u32 {
    let scaled = (extent as f64 * scale + SCALE_EPSILON).trunc();
    (scaled as u32).max(1)
}

fn crop_image(img: &DynamicImage, rect: &PixelRect) -> Result<DynamicImage, PipelineError> {
    if !rect.fits_within(img.width(), img.height()) {
        return Err(PipelineError::invalid_geometry(format!(
            "crop {}x{}+{}+{} outside {}x{} image",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            img.width(),
            img.height()
        )));
    }

    Ok(img.crop_imm(
        rect.x as u32,
        rect.y as u32,
        rect.width as u32,
        rect.height as u32,
    ))
}

/// Secondary resize of the cropped region.
///
/// Same clamp and aspect rules as the primary resize, except that both
/// targets clamping to zero leaves the region untouched.
fn apply_margin(
    img: DynamicImage,
    margin_width: u32,
    margin_height: u32,
) -> Result<DynamicImage, PipelineError> {
    let (width, height) = (img.width(), img.height());
    let target_width = clamp_target(margin_width, width);
    let target_height = clamp_target(margin_height, height);

    match plan_scales(width, height, target_width, target_height)? {
        Some((width_scale, height_scale)) => {
            let dst_width = scaled_extent(width, width_scale);
            let dst_height = scaled_extent(height, height_scale);
            if dst_width == width && dst_height == height {
                return Ok(img);
            }
            resize_image(&img, dst_width, dst_height)
        }
        None => Ok(img),
    }
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, PipelineError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| PipelineError::invalid_geometry("source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| PipelineError::invalid_geometry("source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| PipelineError::invalid_geometry("target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| PipelineError::invalid_geometry("target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| PipelineError::Internal(format!("failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| PipelineError::Internal(format!("resize failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| PipelineError::Internal("failed to create output buffer".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
