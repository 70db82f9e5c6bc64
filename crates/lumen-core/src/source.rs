//! Input capture: build a root image from a file, raw bytes or a data URL.
//!
//! Only cheap checks happen here (size limit, magic bytes); full decoding is
//! left to the workflow when the root is set.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::{EncodedImage, ImageId};

/// Turns user-supplied payloads into [`EncodedImage`]s.
pub struct SourceLoader {
    limits: LimitsConfig,
}

impl SourceLoader {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read an image file.
    pub async fn from_path(&self, path: &Path) -> Result<EncodedImage, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Decode {
                image_id: ImageId::root(),
                message: format!("Cannot read {}: {}", path.display(), e),
            })?;
        self.from_bytes(bytes, &path.display().to_string())
    }

    /// Validate a raw payload. `origin` only labels errors.
    pub fn from_bytes(&self, bytes: Vec<u8>, origin: &str) -> Result<EncodedImage, PipelineError> {
        let max_bytes = self.limits.max_payload_mb.saturating_mul(1024 * 1024);
        if bytes.len() as u64 > max_bytes {
            return Err(PipelineError::PayloadTooLarge {
                origin: origin.to_string(),
                size_mb: bytes.len() as u64 / (1024 * 1024),
                max_mb: self.limits.max_payload_mb,
            });
        }

        match sniff(&bytes) {
            Sniffed::Supported(mime_type) => Ok(EncodedImage::new(mime_type, bytes)),
            Sniffed::Heic => Err(PipelineError::UnsupportedFormat {
                origin: origin.to_string(),
                format: "heic".to_string(),
            }),
            Sniffed::Unknown => Err(PipelineError::UnsupportedFormat {
                origin: origin.to_string(),
                format: "unrecognized (invalid magic bytes)".to_string(),
            }),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    ///
    /// The declared MIME type is ignored in favour of the sniffed one.
    pub fn from_data_url(&self, url: &str) -> Result<EncodedImage, PipelineError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| PipelineError::InvalidDataUrl("missing data: prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| PipelineError::InvalidDataUrl("missing ',' separator".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(PipelineError::InvalidDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| PipelineError::InvalidDataUrl(e.to_string()))?;
        self.from_bytes(bytes, "data URL")
    }
}

enum Sniffed {
    Supported(&'static str),
    Heic,
    Unknown,
}

/// Identify the format from the first bytes of the payload.
fn sniff(bytes: &[u8]) -> Sniffed {
    let header = &bytes[..bytes.len().min(12)];
    if header.len() < 4 {
        return Sniffed::Unknown;
    }

    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Sniffed::Supported("image/jpeg");
    }
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Sniffed::Supported("image/png");
    }
    if header.starts_with(b"GIF8") {
        return Sniffed::Supported("image/gif");
    }
    if header.starts_with(b"RIFF") && header.len() == 12 && &header[8..12] == b"WEBP" {
        return Sniffed::Supported("image/webp");
    }
    if header.starts_with(b"BM") {
        return Sniffed::Supported("image/bmp");
    }
    // TIFF needs the version bytes, a bare "II"/"MM" is not enough
    if header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A]) {
        return Sniffed::Supported("image/tiff");
    }
    // ISO-BMFF: ftyp box at offset 4, brand decides HEIC vs AVIF
    if header.len() == 12 && &header[4..8] == b"ftyp" {
        return match &header[8..12] {
            b"heic" | b"heix" | b"hevc" | b"hevx" | b"mif1" | b"msf1" => Sniffed::Heic,
            _ => Sniffed::Unknown,
        };
    }
    Sniffed::Unknown
}
