//! Image encoders
//!
//! Trait-based encoders so the engine and the marker compositor share one
//! code path for every output format. Encoding is deterministic: the same
//! pixels always produce the same bytes.

use image::DynamicImage;

use super::format::OutputFormat;
use crate::constants::JPEG_QUALITY;
use crate::error::PipelineError;

/// Trait for image encoders
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode an image to the target format
    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, PipelineError>;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(JPEG_QUALITY)
    }
}

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        // JPEG has no alpha channel
        let rgb = image.to_rgb8();

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.quality);

        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
            .map_err(|e| PipelineError::Internal(format!("jpeg encoding failed: {}", e)))?;

        Ok(output.into_inner())
    }
}

/// Lossless PNG encoder using the image crate
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        let rgba = image.to_rgba8();

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        encoder
            .write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                image::ColorType::Rgba8,
            )
            .map_err(|e| PipelineError::Internal(format!("png encoding failed: {}", e)))?;

        Ok(output.into_inner())
    }
}

/// Factory for creating encoders
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder::default()),
            OutputFormat::Png => Box::new(PngEncoder),
        }
    }
}

/// Encode `image` in `format` with the service-wide settings
pub fn encode(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, PipelineError> {
    EncoderFactory::create(format).encode(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x * 7) as u8, (y * 11) as u8, 128, 255])
        }))
    }

    #[test]
    fn test_jpeg_output_is_jpeg() {
        let data = encode(&gradient(16, 8), OutputFormat::Jpeg).unwrap();
        assert_eq!(&data[..3], &[0xFF, 0xD8, 0xFF]);
        assert_eq!(
            image::guess_format(&data).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_png_is_lossless() {
        let source = gradient(9, 5);
        let data = encode(&source, OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.to_rgba8(), source.to_rgba8());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let source = gradient(32, 32);
        for format in [OutputFormat::Jpeg, OutputFormat::Png] {
            let a = encode(&source, format).unwrap();
            let b = encode(&source, format).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_factory_formats() {
        assert_eq!(EncoderFactory::create(OutputFormat::Jpeg).format(), OutputFormat::Jpeg);
        assert_eq!(EncoderFactory::create(OutputFormat::Png).format(), OutputFormat::Png);
    }
}
