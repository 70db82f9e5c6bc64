//! Reprocessing engine: recompute every step of a pipeline in chain order.
//!
//! A pass walks the steps with a cursor that starts at the root. Each step is
//! re-executed against the cursor, its output gets a fresh identifier, and
//! the cursor moves to that output. Outputs are never reused across passes,
//! even when the content is byte-identical.

use std::time::Instant;

use crate::error::PipelineError;
use crate::graph::{IdGenerator, Pipeline};
use crate::operations::OperationRegistry;
use crate::types::Image;
#[cfg(test)]
use crate::types::ImageId;

/// Why a pass stopped early.
#[derive(Debug)]
pub struct ReprocessFailure {
    /// `StepFailed` naming the failing step, or `Superseded`
    pub error: PipelineError,
    /// What the pipeline looks like after the steps that did succeed.
    ///
    /// The reprocessed prefix is kept, the failing step is relinked to the
    /// last good output and keeps its old output, later steps are untouched.
    /// `None` for superseded passes, whose outputs are discarded.
    pub partial: Option<Pipeline>,
}

impl ReprocessFailure {
    fn superseded() -> Self {
        Self {
            error: PipelineError::Superseded,
            partial: None,
        }
    }
}

impl From<ReprocessFailure> for PipelineError {
    fn from(failure: ReprocessFailure) -> Self {
        failure.error
    }
}

/// Runs reprocessing passes with a registry and an identifier source.
pub struct ReprocessingEngine<'a> {
    registry: &'a OperationRegistry,
    ids: &'a IdGenerator,
}

impl<'a> ReprocessingEngine<'a> {
    pub fn new(registry: &'a OperationRegistry, ids: &'a IdGenerator) -> Self {
        Self { registry, ids }
    }

    /// Recompute every step of `pipeline`.
    pub async fn reprocess_all(&self, pipeline: &Pipeline) -> Result<Pipeline, ReprocessFailure> {
        self.reprocess_until(pipeline, || false).await
    }

    /// Recompute every step, checking `superseded` before each one and once
    /// more at the end. A pass that sees `true` is abandoned.
    pub async fn reprocess_until<F>(
        &self,
        pipeline: &Pipeline,
        superseded: F,
    ) -> Result<Pipeline, ReprocessFailure>
    where
        F: Fn() -> bool,
    {
        let Some(root) = pipeline.root() else {
            return match pipeline.steps().first() {
                None => Ok(pipeline.clone()),
                Some(step) => Err(ReprocessFailure {
                    error: PipelineError::UnknownImage(step.input_id().clone()),
                    partial: Some(pipeline.clone()),
                }),
            };
        };

        let start = Instant::now();
        let mut cursor: Image = root.clone();
        let mut steps = Vec::with_capacity(pipeline.len());

        for (index, step) in pipeline.steps().iter().enumerate() {
            if superseded() {
                tracing::debug!("Reprocessing superseded before step {}", index);
                return Err(ReprocessFailure::superseded());
            }

            match self
                .registry
                .apply(step.operation(), &cursor, step.options())
                .await
            {
                Ok(encoded) => {
                    let output = Image::new(self.ids.next_id(), encoded);
                    steps.push(step.recomputed(cursor.id().clone(), output.clone()));
                    cursor = output;
                }
                Err(cause) => {
                    tracing::warn!(
                        "Reprocessing failed at step {} ({}): {}",
                        index,
                        step.operation(),
                        cause
                    );
                    steps.push(step.clone().relinked(cursor.id().clone()));
                    steps.extend(pipeline.steps()[index + 1..].iter().cloned());
                    return Err(ReprocessFailure {
                        error: PipelineError::StepFailed {
                            output_id: step.output().id().clone(),
                            operation: step.operation().name().to_string(),
                            cause: Box::new(cause),
                        },
                        partial: Some(Pipeline::from_parts(Some(root.clone()), steps)),
                    });
                }
            }
        }

        if superseded() {
            return Err(ReprocessFailure::superseded());
        }

        tracing::debug!(
            "Reprocessed {} step(s) in {:?}",
            steps.len(),
            start.elapsed()
        );
        Ok(Pipeline::from_parts(Some(root.clone()), steps))
    }
}

/// Identifiers of `after` that already existed in `before`, root excluded.
#[cfg(test)]
pub(crate) fn reused_ids<'p>(before: &Pipeline, after: &'p Pipeline) -> Vec<&'p ImageId> {
    let old = before.image_ids();
    after
        .steps()
        .iter()
        .map(|step| step.output().id())
        .filter(|id| old.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::operations::Operation;
    use crate::types::{EncodedImage, Step, StepOptions};
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::cell::Cell;
    use std::io::Cursor;

    fn png(pixel: [u8; 4]) -> EncodedImage {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba(pixel)));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        EncodedImage::new("image/png", buffer.into_inner())
    }

    fn first_pixel(image: &Image) -> [u8; 4] {
        image::load_from_memory(image.bytes())
            .unwrap()
            .to_rgba8()
            .get_pixel(0, 0)
            .0
    }

    /// Builds root -> op... with placeholder outputs that are not real images.
    fn stale_pipeline(root: EncodedImage, ops: &[Operation]) -> Pipeline {
        let mut steps = Vec::new();
        let mut input = ImageId::root();
        for (i, op) in ops.iter().enumerate() {
            let output = Image::new(
                ImageId::new(format!("old-{}", i)),
                EncodedImage::new("image/png", vec![0]),
            );
            steps.push(Step::new(input, *op, StepOptions::new(), output));
            input = ImageId::new(format!("old-{}", i));
        }
        Pipeline::from_parts(Some(Image::new(ImageId::root(), root)), steps)
    }

    #[tokio::test]
    async fn test_recomputes_in_chain_order() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let pipeline = stale_pipeline(
            png([90, 30, 0, 255]),
            &[Operation::Grayscale, Operation::Invert],
        );
        let fresh = engine.reprocess_all(&pipeline).await.unwrap();

        assert!(fresh.check_chain().is_ok());
        assert_eq!(first_pixel(fresh.steps()[0].output()), [40, 40, 40, 255]);
        assert_eq!(first_pixel(fresh.steps()[1].output()), [215, 215, 215, 255]);
    }

    #[tokio::test]
    async fn test_identifiers_are_fresh() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let pipeline = stale_pipeline(png([1, 2, 3, 255]), &[Operation::Invert, Operation::Blur]);
        let first = engine.reprocess_all(&pipeline).await.unwrap();
        assert!(reused_ids(&pipeline, &first).is_empty());

        let second = engine.reprocess_all(&first).await.unwrap();
        assert!(reused_ids(&first, &second).is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_is_byte_identical() {
        let mut config = Config::default();
        config.engine.memoize = false;
        let registry = OperationRegistry::new(&config);
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let pipeline = stale_pipeline(
            png([200, 10, 60, 255]),
            &[Operation::Blur, Operation::Grayscale, Operation::ToJpg],
        );
        let first = engine.reprocess_all(&pipeline).await.unwrap();
        let second = engine.reprocess_all(&first).await.unwrap();
        for (a, b) in first.steps().iter().zip(second.steps()) {
            assert_eq!(a.output().bytes(), b.output().bytes());
            assert_ne!(a.output().id(), b.output().id());
        }
    }

    #[tokio::test]
    async fn test_failure_reports_step_and_keeps_chain() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        // An undecodable root makes the very first step fail.
        let pipeline = stale_pipeline(
            EncodedImage::new("image/png", b"garbage".to_vec()),
            &[Operation::Invert, Operation::Blur],
        );
        let failure = engine.reprocess_all(&pipeline).await.unwrap_err();

        match &failure.error {
            PipelineError::StepFailed {
                output_id,
                operation,
                cause,
            } => {
                assert_eq!(output_id.as_str(), "old-0");
                assert_eq!(operation, "invert");
                assert!(matches!(**cause, PipelineError::Decode { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        let partial = failure.partial.unwrap();
        assert_eq!(partial.len(), 2);
        assert_eq!(partial.steps()[0].output().id().as_str(), "old-0");
        assert!(partial.check_chain().is_ok());
    }

    #[tokio::test]
    async fn test_mid_chain_failure_keeps_fresh_prefix() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let root = png([7, 7, 7, 255]);
        // invert "succeeds" with an undecodable payload, so blur fails next
        registry.seed_cache(
            Operation::Invert,
            root.bytes(),
            &StepOptions::new(),
            EncodedImage::new("image/png", b"corrupt".to_vec()),
        );
        let pipeline = stale_pipeline(
            root,
            &[Operation::Invert, Operation::Blur, Operation::Grayscale],
        );
        let failure = engine.reprocess_all(&pipeline).await.unwrap_err();

        match &failure.error {
            PipelineError::StepFailed {
                output_id,
                operation,
                cause,
            } => {
                assert_eq!(output_id.as_str(), "old-1");
                assert_eq!(operation, "blur");
                assert!(matches!(**cause, PipelineError::Decode { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        let partial = failure.partial.unwrap();
        let steps = partial.steps();
        assert_eq!(steps.len(), 3);
        // reprocessed prefix has a fresh id
        assert_ne!(steps[0].output().id().as_str(), "old-0");
        assert_eq!(steps[0].output().bytes(), b"corrupt");
        // failing step relinked to it, keeping its stale output
        assert_eq!(steps[1].input_id(), steps[0].output().id());
        assert_eq!(steps[1].output().id().as_str(), "old-1");
        // suffix untouched
        assert_eq!(steps[2], pipeline.steps()[2]);
        assert!(partial.check_chain().is_ok());
    }

    #[tokio::test]
    async fn test_limit_violation_is_a_step_failure() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let mut config = Config::default();
        config.limits.max_image_dimension = 1;
        let strict = OperationRegistry::new(&config);
        let strict_engine = ReprocessingEngine::new(&strict, &ids);

        // A 2x2 root passes the default registry but not the strict one.
        let pipeline = stale_pipeline(png([5, 5, 5, 255]), &[Operation::Invert]);
        assert!(engine.reprocess_all(&pipeline).await.is_ok());

        let failure = strict_engine.reprocess_all(&pipeline).await.unwrap_err();
        let PipelineError::StepFailed { cause, .. } = failure.error else {
            panic!("expected StepFailed");
        };
        assert!(matches!(*cause, PipelineError::ImageTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_superseded_pass_is_discarded() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let pipeline = stale_pipeline(png([1, 1, 1, 255]), &[Operation::Invert, Operation::Invert]);
        let checks = Cell::new(0);
        let failure = engine
            .reprocess_until(&pipeline, || {
                checks.set(checks.get() + 1);
                checks.get() > 1
            })
            .await
            .unwrap_err();

        assert!(matches!(failure.error, PipelineError::Superseded));
        assert!(failure.partial.is_none());
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let registry = OperationRegistry::new(&Config::default());
        let ids = IdGenerator::new();
        let engine = ReprocessingEngine::new(&registry, &ids);

        let empty = Pipeline::new();
        assert_eq!(engine.reprocess_all(&empty).await.unwrap(), empty);

        let root_only = Pipeline::with_root(Image::new(ImageId::root(), png([0, 0, 0, 255])));
        assert_eq!(engine.reprocess_all(&root_only).await.unwrap(), root_only);
        // nothing was minted
        assert!(ids.next_id().as_str().ends_with("-1"));
    }
}
