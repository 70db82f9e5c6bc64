//! Re-encoding pixel surfaces into output formats.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageResult};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::config::EncodingConfig;

/// Output formats the registry can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFormat {
    /// Lossless PNG
    Png,
    /// Lossy JPEG at the configured quality
    Jpeg,
    /// WebP (the imaging library only ships a lossless encoder)
    WebP,
}

impl EncodeFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            EncodeFormat::Png => "image/png",
            EncodeFormat::Jpeg => "image/jpeg",
            EncodeFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Png => "png",
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::WebP => "webp",
        }
    }
}

impl std::fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encodes decoded images. Stateless apart from the quality setting.
#[derive(Debug, Clone, Copy)]
pub struct ImageEncoder {
    jpeg_quality: u8,
}

impl ImageEncoder {
    pub fn new(config: &EncodingConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Encode `image` into `format`. Pixel values are not altered beyond what
    /// the target format requires (JPEG has no alpha channel).
    pub fn encode(&self, image: &DynamicImage, format: EncodeFormat) -> ImageResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match format {
            EncodeFormat::Png => image.write_to(&mut buffer, ImageFormat::Png)?,
            EncodeFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut buffer,
                    self.jpeg_quality,
                ))?;
            }
            EncodeFormat::WebP => {
                // The WebP encoder accepts 8-bit RGB(A) only.
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                rgba.write_to(&mut buffer, ImageFormat::WebP)?;
            }
        }
        Ok(buffer.into_inner())
    }
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new(&EncodingConfig::default())
    }
}
