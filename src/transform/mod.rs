//! Image transformation
//!
//! Pure, synchronous image work. Callers on the async path run it on a
//! blocking thread.

pub mod coordinates;
pub mod encoder;
pub mod engine;
pub mod format;

pub use coordinates::{effective_dimensions, resolve, PixelRect};
pub use encoder::{encode, EncoderFactory, ImageEncoder};
pub use engine::{decode_image, render, transform, RenderedImage};
pub use format::{content_type_for_path, OutputFormat};
