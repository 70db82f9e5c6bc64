//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum source payload size in megabytes
    pub max_payload_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Timeout for one operation (decode, transform, encode) in milliseconds
    pub operation_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            operation_timeout_ms: 30000,
        }
    }
}

/// Encoder settings for the format-conversion operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// JPEG quality (1-100) used by `to_jpg`
    pub jpeg_quality: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        // Browsers encode canvas JPEG at 0.92 unless told otherwise.
        Self { jpeg_quality: 92 }
    }
}

/// What a mutation does when another one is already in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Wait behind the in-flight mutation
    #[default]
    Queue,
    /// Fail immediately with `PipelineBusy`
    Reject,
}

/// Workflow engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Policy for concurrent mutations
    pub busy_policy: BusyPolicy,

    /// Reuse operation results for identical input content
    pub memoize: bool,

    /// Maximum number of memoized operation results
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            busy_policy: BusyPolicy::Queue,
            memoize: true,
            cache_capacity: 64,
        }
    }
}

/// Local export settings for the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory exported images are written to (supports `~`)
    pub dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: "~/.lumen/exports".to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    pub pretty: bool,

    /// Embed image payloads as data URLs in snapshots
    pub include_payloads: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
