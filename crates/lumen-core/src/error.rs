//! Error types for the Lumen workflow engine.
//!
//! Errors are organized by layer so that callers can tell a stale UI
//! reference (`UnknownImage`) from a bad payload (`Decode`) from a
//! scheduling conflict (`PipelineBusy`) without string matching.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ImageId;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline and operation errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Storage collaborator errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the operation registry, the pipeline graph and the
/// reprocessing engine.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Operation name is not part of the catalog
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    /// Identifier does not resolve to the root or any step output
    #[error("Unknown image: {0}")]
    UnknownImage(ImageId),

    /// Image already feeds a step; the chain only grows at its end
    #[error("Image {0} already has a downstream step")]
    NotTerminal(ImageId),

    /// Payload could not be decoded as a raster image
    #[error("Decode error for {image_id}: {message}")]
    Decode { image_id: ImageId, message: String },

    /// Pixel surface could not be encoded into the requested format
    #[error("Encode error for {image_id} ({format}): {message}")]
    Encode {
        image_id: ImageId,
        format: String,
        message: String,
    },

    /// Input is an image format the core does not handle
    #[error("Unsupported format for {origin}: {format}")]
    UnsupportedFormat { origin: String, format: String },

    /// Input payload exceeds the size limit
    #[error("Payload too large: {origin} ({size_mb}MB > {max_mb}MB)")]
    PayloadTooLarge {
        origin: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {image_id} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        image_id: ImageId,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Source file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Malformed `data:` URL
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// Codec work did not finish in time
    #[error("Timeout in {stage} stage for {image_id} after {timeout_ms}ms")]
    Timeout {
        image_id: ImageId,
        stage: String,
        timeout_ms: u64,
    },

    /// Another mutation is in flight and the busy policy is `reject`
    #[error("Pipeline is busy with another mutation; retry once it completes")]
    PipelineBusy,

    /// Reprocessing pass abandoned because a newer root arrived
    #[error("Reprocessing pass superseded by a newer root image")]
    Superseded,

    /// A step failed during a reprocessing pass
    #[error("Step {operation} (output {output_id}) failed: {cause}")]
    StepFailed {
        output_id: ImageId,
        operation: String,
        #[source]
        cause: Box<PipelineError>,
    },
}

/// Errors raised by the object-storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing the object failed
    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),

    /// The store cannot accept this payload
    #[error("Unsupported payload: {0}")]
    Unsupported(String),
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
