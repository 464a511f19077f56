//! Thumbnail rendering.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageResult};

/// Default bound for the longest thumbnail side, in pixels.
pub const DEFAULT_MAX_SIDE: u32 = 400;
/// Default JPEG quality for thumbnails (0–100).
pub const DEFAULT_QUALITY: u8 = 85;

/// How thumbnails are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    /// Longest side of the thumbnail, in pixels.
    pub max_side: u32,
    /// JPEG quality.
    pub quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_side: DEFAULT_MAX_SIDE,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Decode a JPEG, fit it into a `max_side` box and re-encode it.
///
/// The aspect ratio is preserved and images already inside the box are not
/// upscaled.
pub fn render(jpeg: &[u8], options: &ThumbnailOptions) -> ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)?;

    let img = if img.width() > options.max_side || img.height() > options.max_side {
        img.thumbnail(options.max_side, options.max_side)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, options.quality))?;
    Ok(buffer.into_inner())
}
