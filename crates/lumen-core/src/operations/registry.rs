//! Executes catalog operations against encoded images.
//!
//! One invocation is decode, transform (or not), encode, all inside a single
//! `spawn_blocking` task bounded by the operation timeout. The registry keeps
//! no per-invocation state; dropping the returned future abandons the work.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use super::cache::{CacheKey, OperationCache};
use super::{Operation, OperationKind};
use crate::codec::{ImageDecoder, ImageEncoder};
use crate::config::{Config, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{EncodedImage, Image, ImageId, StepOptions};

/// The fixed operation catalog plus the codecs it runs on.
pub struct OperationRegistry {
    limits: LimitsConfig,
    encoder: ImageEncoder,
    cache: Option<Mutex<OperationCache>>,
}

impl OperationRegistry {
    /// Create a registry from the full configuration.
    pub fn new(config: &Config) -> Self {
        let cache = config
            .engine
            .memoize
            .then(|| Mutex::new(OperationCache::new(config.engine.cache_capacity)));
        Self {
            limits: config.limits.clone(),
            encoder: ImageEncoder::new(&config.encoding),
            cache,
        }
    }

    /// Execute an operation by catalog name.
    ///
    /// Fails with `UnknownOperation` before touching the input if `name` is
    /// not in the catalog.
    pub async fn execute(
        &self,
        name: &str,
        input: &Image,
        options: &StepOptions,
    ) -> PipelineResult<EncodedImage> {
        let operation: Operation = name.parse()?;
        self.apply(operation, input, options).await
    }

    /// Execute an already-validated operation.
    pub async fn apply(
        &self,
        operation: Operation,
        input: &Image,
        options: &StepOptions,
    ) -> PipelineResult<EncodedImage> {
        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(operation, input.bytes(), options));
        if let Some(hit) = self.cached(key.as_ref()) {
            tracing::trace!("  {} on {}: cache hit", operation, input.id());
            return Ok(hit);
        }

        let start = Instant::now();
        let bytes = input.shared_bytes();
        let image_id = input.id().clone();
        let limits = self.limits.clone();
        let encoder = self.encoder;
        let timeout_duration = Duration::from_millis(self.limits.operation_timeout_ms);

        let task_id = image_id.clone();
        let result = timeout(timeout_duration, async move {
            tokio::task::spawn_blocking(move || {
                Self::run_sync(operation, &bytes, &task_id, &limits, encoder)
            })
            .await
        })
        .await;

        let encoded = match result {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(PipelineError::Decode {
                    image_id,
                    message: format!("Task join error: {}", e),
                })
            }
            Err(_) => {
                return Err(PipelineError::Timeout {
                    image_id,
                    stage: operation.name().to_string(),
                    timeout_ms: self.limits.operation_timeout_ms,
                })
            }
        };
        tracing::trace!("  {} on {}: {:?}", operation, image_id, start.elapsed());

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Ok(mut cache) = cache.lock() {
                cache.insert(key, encoded.clone());
            }
        }
        Ok(encoded)
    }

    /// Number of memoized results, or `None` when memoization is off.
    pub fn cached_entries(&self) -> Option<usize> {
        let cache = self.cache.as_ref()?;
        cache.lock().ok().map(|cache| cache.len())
    }

    /// Pretend `operation` on `input` produced `output`.
    #[cfg(test)]
    pub(crate) fn seed_cache(
        &self,
        operation: Operation,
        input: &[u8],
        options: &StepOptions,
        output: EncodedImage,
    ) {
        if let Some(Ok(mut cache)) = self.cache.as_ref().map(|cache| cache.lock()) {
            cache.insert(CacheKey::new(operation, input, options), output);
        }
    }

    fn cached(&self, key: Option<&CacheKey>) -> Option<EncodedImage> {
        let (cache, key) = (self.cache.as_ref()?, key?);
        let mut cache = cache.lock().ok()?;
        cache.get(key)
    }

    /// Decode, apply and encode (runs in spawn_blocking).
    fn run_sync(
        operation: Operation,
        bytes: &[u8],
        image_id: &ImageId,
        limits: &LimitsConfig,
        encoder: ImageEncoder,
    ) -> PipelineResult<EncodedImage> {
        let decoded = ImageDecoder::decode_sync(bytes, image_id, limits)?;
        let surface = match operation.kind() {
            OperationKind::Transform(transform) => transform(&decoded.image),
            OperationKind::Encode(_) => decoded.image,
        };
        let format = operation.output_format();
        let encoded = encoder
            .encode(&surface, format)
            .map_err(|e| PipelineError::Encode {
                image_id: image_id.clone(),
                format: format.to_string(),
                message: e.to_string(),
            })?;
        Ok(EncodedImage::new(format.mime_type(), encoded))
    }
}
