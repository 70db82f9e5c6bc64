//! Image codec primitives.
//!
//! - **decode**: payload bytes to a pixel surface, content-sniffed
//! - **encode**: pixel surface to PNG, JPEG or WebP

pub mod decode;
pub mod encode;

pub use decode::{format_to_mime, mime_extension, DecodedImage, ImageDecoder};
pub use encode::{EncodeFormat, ImageEncoder};
