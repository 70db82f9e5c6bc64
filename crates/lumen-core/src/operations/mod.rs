//! The operation catalog and its executor.
//!
//! The catalog is closed: [`Operation`] enumerates every operation, and names
//! outside it are rejected when parsed rather than looked up lazily.
//!
//! - **pixel**: pure pixel transforms (grayscale, invert, blur)
//! - **registry**: runs an operation against an encoded image
//! - **cache**: bounded memo of results keyed by input content

pub mod cache;
pub mod pixel;
pub mod registry;

pub use cache::OperationCache;
pub use registry::OperationRegistry;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codec::EncodeFormat;
use crate::error::PipelineError;

/// Every operation a step can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Grayscale,
    Invert,
    Blur,
    ToPng,
    ToJpg,
    ToWebp,
}

/// What an operation does to its input.
#[derive(Debug, Clone, Copy)]
pub enum OperationKind {
    /// Pixel transform; the result is encoded as PNG.
    Transform(fn(&DynamicImage) -> DynamicImage),
    /// Pure re-encode into the given format.
    Encode(EncodeFormat),
}

impl Operation {
    /// The full catalog in display order.
    pub const ALL: [Operation; 6] = [
        Operation::Grayscale,
        Operation::Invert,
        Operation::Blur,
        Operation::ToPng,
        Operation::ToJpg,
        Operation::ToWebp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Grayscale => "grayscale",
            Operation::Invert => "invert",
            Operation::Blur => "blur",
            Operation::ToPng => "to_png",
            Operation::ToJpg => "to_jpg",
            Operation::ToWebp => "to_webp",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Operation::Grayscale => "Average R, G and B into a gray level",
            Operation::Invert => "Invert R, G and B",
            Operation::Blur => "Gaussian blur with a 5px radius",
            Operation::ToPng => "Re-encode as PNG",
            Operation::ToJpg => "Re-encode as JPEG",
            Operation::ToWebp => "Re-encode as WebP",
        }
    }

    pub fn kind(self) -> OperationKind {
        match self {
            Operation::Grayscale => OperationKind::Transform(pixel::grayscale),
            Operation::Invert => OperationKind::Transform(pixel::invert),
            Operation::Blur => OperationKind::Transform(pixel::blur),
            Operation::ToPng => OperationKind::Encode(EncodeFormat::Png),
            Operation::ToJpg => OperationKind::Encode(EncodeFormat::Jpeg),
            Operation::ToWebp => OperationKind::Encode(EncodeFormat::WebP),
        }
    }

    /// Format the operation's output is encoded in.
    pub fn output_format(self) -> EncodeFormat {
        match self.kind() {
            OperationKind::Transform(_) => EncodeFormat::Png,
            OperationKind::Encode(format) => format,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| PipelineError::UnknownOperation {
                name: s.to_string(),
            })
    }
}
