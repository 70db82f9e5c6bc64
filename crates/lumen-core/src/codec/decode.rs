//! Payload decoding with format detection, dimension limits and timeout.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::{Image, ImageId};

/// Image decoder with configurable limits and timeout.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image payload.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded pixel surface
    pub image: DynamicImage,
    /// Format detected from the payload's content
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an image off the async runtime, bounded by the decode timeout.
    pub async fn decode(&self, image: &Image) -> Result<DecodedImage, PipelineError> {
        let bytes = image.shared_bytes();
        let image_id = image.id().clone();
        let limits = self.limits.clone();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let task_id = image_id.clone();
        let decode_result = timeout(timeout_duration, async move {
            tokio::task::spawn_blocking(move || Self::decode_sync(&bytes, &task_id, &limits)).await
        })
        .await;

        match decode_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Decode {
                image_id,
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                image_id,
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode from bytes.
    ///
    /// Format is detected from the content only; the MIME tag on the image is
    /// not trusted.
    pub fn decode_sync(
        bytes: &[u8],
        image_id: &ImageId,
        limits: &LimitsConfig,
    ) -> Result<DecodedImage, PipelineError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                image_id: image_id.clone(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = reader.format().ok_or_else(|| PipelineError::Decode {
            image_id: image_id.clone(),
            message: "Unrecognized image format".to_string(),
        })?;
        let image = reader.decode().map_err(|e| PipelineError::Decode {
            image_id: image_id.clone(),
            message: e.to_string(),
        })?;

        let (width, height) = image.dimensions();
        if width > limits.max_image_dimension || height > limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                image_id: image_id.clone(),
                width,
                height,
                max_dim: limits.max_image_dimension,
            });
        }

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }
}

/// MIME type for a detected image format.
pub fn format_to_mime(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Avif => "image/avif",
        _ => "application/octet-stream",
    }
}

/// File extension for a MIME type, used when naming exported objects.
pub fn mime_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/tiff" => "tiff",
        "image/bmp" => "bmp",
        "image/x-icon" => "ico",
        "image/avif" => "avif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EncodedImage;
    use image::RgbaImage;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_format_to_mime() {
        assert_eq!(format_to_mime(ImageFormat::Jpeg), "image/jpeg");
        assert_eq!(format_to_mime(ImageFormat::Png), "image/png");
        assert_eq!(format_to_mime(ImageFormat::WebP), "image/webp");
    }

    #[test]
    fn test_mime_extension() {
        assert_eq!(mime_extension("image/jpeg"), "jpg");
        assert_eq!(mime_extension("image/webp"), "webp");
        assert_eq!(mime_extension("text/plain"), "bin");
    }

    #[test]
    fn test_format_detected_by_content() {
        // PNG bytes mislabelled as JPEG still decode as PNG
        let bytes = png_bytes(3, 2);
        let decoded =
            ImageDecoder::decode_sync(&bytes, &ImageId::root(), &LimitsConfig::default()).unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width, decoded.height), (3, 2));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = ImageDecoder::decode_sync(b"not an image", &ImageId::root(), &LimitsConfig::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_dimension_limit() {
        let limits = LimitsConfig {
            max_image_dimension: 4,
            ..LimitsConfig::default()
        };
        let bytes = png_bytes(5, 1);
        let err = ImageDecoder::decode_sync(&bytes, &ImageId::root(), &limits).unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 5, .. }));
    }

    #[tokio::test]
    async fn test_async_decode() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let image = Image::new(
            ImageId::root(),
            EncodedImage::new("image/jpeg", png_bytes(2, 2)),
        );
        let decoded = decoder.decode(&image).await.unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }
}
