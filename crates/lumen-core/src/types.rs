//! Core data types: images, identifiers and steps.
//!
//! Every value here is immutable once built. A transformation never edits an
//! [`Image`]; it produces a new one with a new [`ImageId`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::operations::Operation;

/// Identifier reserved for the pipeline's source image.
pub const ROOT_ID: &str = "root";

/// Session-unique identifier of an [`Image`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved root identifier.
    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An encoded payload tagged with its MIME type, not yet given an identity.
///
/// This is what the operation registry produces; the graph wraps it into an
/// [`Image`] once it has minted an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle on the payload, cheap to move into blocking tasks.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An immutable encoded image with a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    id: ImageId,
    encoded: EncodedImage,
}

impl Image {
    pub fn new(id: ImageId, encoded: EncodedImage) -> Self {
        Self { id, encoded }
    }

    pub fn id(&self) -> &ImageId {
        &self.id
    }

    pub fn mime_type(&self) -> &str {
        self.encoded.mime_type()
    }

    pub fn bytes(&self) -> &[u8] {
        self.encoded.bytes()
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        self.encoded.shared_bytes()
    }

    pub fn encoded(&self) -> &EncodedImage {
        &self.encoded
    }

    /// Render the payload as a `data:<mime>;base64,<payload>` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            BASE64.encode(self.bytes())
        )
    }
}

/// Opaque, operation-specific configuration attached to a step.
///
/// A `BTreeMap` keeps key order stable so the serialized form can be used as
/// part of a memoization key.
pub type StepOptions = BTreeMap<String, serde_json::Value>;

/// One applied operation linking an input image to its output.
///
/// A step has exactly one output; the chain is linear. Branching would need
/// a real graph with several outgoing edges per node, not more outputs here.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    input_id: ImageId,
    operation: Operation,
    options: StepOptions,
    output: Image,
}

impl Step {
    pub fn new(input_id: ImageId, operation: Operation, options: StepOptions, output: Image) -> Self {
        Self {
            input_id,
            operation,
            options,
            output,
        }
    }

    pub fn input_id(&self) -> &ImageId {
        &self.input_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn options(&self) -> &StepOptions {
        &self.options
    }

    /// The step's sole output image.
    pub fn output(&self) -> &Image {
        &self.output
    }

    /// Output images in order. Always exactly one element.
    pub fn output_images(&self) -> &[Image] {
        std::slice::from_ref(&self.output)
    }

    /// Same step, now consuming `input_id`.
    pub(crate) fn relinked(self, input_id: ImageId) -> Self {
        Self { input_id, ..self }
    }

    /// Same operation and options, recomputed against a new input.
    pub(crate) fn recomputed(&self, input_id: ImageId, output: Image) -> Self {
        Self {
            input_id,
            operation: self.operation,
            options: self.options.clone(),
            output,
        }
    }
}
