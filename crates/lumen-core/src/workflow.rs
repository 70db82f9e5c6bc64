//! The workflow: one owned pipeline plus the machinery to edit it safely.
//!
//! Reads are snapshots (`Arc<Pipeline>`), writes go through `set_root`,
//! `add_step` and `remove_step` only. Mutations are serialized by a single
//! in-flight guard; the configured [`BusyPolicy`] decides whether a second
//! mutation queues behind it or fails with `PipelineBusy`.
//!
//! A new pipeline value is published only when a mutation finishes, so a
//! dropped mutation future leaves the published state untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::codec::ImageDecoder;
use crate::config::{BusyPolicy, Config};
use crate::engine::{ReprocessFailure, ReprocessingEngine};
use crate::error::{PipelineError, PipelineResult};
use crate::graph::{IdGenerator, Pipeline, PipelineSnapshot};
use crate::operations::{Operation, OperationRegistry};
use crate::types::{EncodedImage, Image, ImageId, Step, StepOptions};

/// An editable image pipeline.
pub struct Workflow {
    registry: OperationRegistry,
    decoder: ImageDecoder,
    ids: IdGenerator,
    busy_policy: BusyPolicy,
    mutation: Mutex<()>,
    root_generation: AtomicU64,
    state: watch::Sender<PipelineSnapshot>,
}

impl Workflow {
    /// Create an empty workflow (no root, no steps).
    pub fn new(config: &Config) -> Self {
        let (state, _) = watch::channel(Arc::new(Pipeline::new()));
        Self {
            registry: OperationRegistry::new(config),
            decoder: ImageDecoder::new(config.limits.clone()),
            ids: IdGenerator::new(),
            busy_policy: config.engine.busy_policy,
            mutation: Mutex::new(()),
            root_generation: AtomicU64::new(0),
            state,
        }
    }

    /// Current pipeline state.
    pub fn snapshot(&self) -> PipelineSnapshot {
        Arc::clone(&self.state.borrow())
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.state.subscribe()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn resolve_image(&self, id: &ImageId) -> Option<Image> {
        self.snapshot().resolve_image(id).cloned()
    }

    pub fn is_terminal(&self, id: &ImageId) -> bool {
        self.snapshot().is_terminal(id)
    }

    /// Replace the root image and reprocess every step against it.
    ///
    /// The payload is decoded before anything else; an undecodable root
    /// leaves the pipeline untouched and cancels nothing. If a later
    /// `set_root` arrives while this one is still reprocessing, this pass
    /// stops with `Superseded` and publishes nothing.
    /// If a step fails, the partially reprocessed pipeline is published and
    /// the `StepFailed` error returned.
    pub async fn set_root(&self, encoded: EncodedImage) -> PipelineResult<()> {
        // Only a decodable root may supersede one already in flight.
        let root = Image::new(ImageId::root(), encoded);
        let decoded = self.decoder.decode(&root).await?;

        let (_guard, generation) = match self.busy_policy {
            BusyPolicy::Queue => {
                let generation = self.root_generation.fetch_add(1, Ordering::SeqCst) + 1;
                (self.mutation.lock().await, generation)
            }
            BusyPolicy::Reject => {
                let guard = self.try_begin()?;
                (guard, self.root_generation.fetch_add(1, Ordering::SeqCst) + 1)
            }
        };
        tracing::debug!(
            "New root: {} ({}x{}, {} bytes)",
            root.mime_type(),
            decoded.width,
            decoded.height,
            root.bytes().len()
        );

        let mut next = (*self.snapshot()).clone();
        next.replace_root(root);
        let result = self
            .engine()
            .reprocess_until(&next, || self.superseded(generation))
            .await;

        match result {
            Ok(pipeline) => {
                self.publish(pipeline);
                Ok(())
            }
            Err(failure) => Err(self.publish_partial(failure)),
        }
    }

    /// Apply `operation` to the image `input_id` and append the new step.
    ///
    /// The input must be terminal. On any error the pipeline is unchanged.
    pub async fn add_step(
        &self,
        input_id: &ImageId,
        operation: &str,
        options: StepOptions,
    ) -> PipelineResult<Step> {
        let _guard = self.begin().await?;
        let operation: Operation = operation.parse()?;

        let current = self.snapshot();
        let input = current
            .resolve_image(input_id)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownImage(input_id.clone()))?;
        if !current.is_terminal(input_id) {
            return Err(PipelineError::NotTerminal(input_id.clone()));
        }

        let encoded = self.registry.apply(operation, &input, &options).await?;
        let output = Image::new(self.ids.next_id(), encoded);
        let step = Step::new(input_id.clone(), operation, options, output);

        let mut next = (*current).clone();
        next.push_step(step.clone())?;
        tracing::debug!(
            "Added step {} on {} -> {}",
            operation,
            input_id,
            step.output().id()
        );
        self.publish(next);
        Ok(step)
    }

    /// Delete the step producing `output_id`, relink its successor and
    /// reprocess.
    ///
    /// Returns `Ok(false)` without touching anything if no step produces
    /// `output_id`. If a newer root supersedes the reprocessing pass, the
    /// relinked chain is still published; the newer root reprocesses it.
    pub async fn remove_step(&self, output_id: &ImageId) -> PipelineResult<bool> {
        let _guard = self.begin().await?;
        let generation = self.root_generation.load(Ordering::SeqCst);

        let mut next = (*self.snapshot()).clone();
        let Some(removed) = next.unlink_step(output_id) else {
            tracing::debug!("No step produces {}; nothing to remove", output_id);
            return Ok(false);
        };
        tracing::debug!("Removed step {} ({})", removed.operation(), output_id);

        let result = self
            .engine()
            .reprocess_until(&next, || self.superseded(generation))
            .await;

        match result {
            Ok(pipeline) => self.publish(pipeline),
            Err(ReprocessFailure {
                error: PipelineError::Superseded,
                ..
            }) => self.publish(next),
            Err(failure) => return Err(self.publish_partial(failure)),
        }
        Ok(true)
    }

    /// Run a fresh reprocessing pass over the current pipeline.
    ///
    /// This is the retry hook after a failed pass; the engine never retries
    /// on its own.
    pub async fn reprocess(&self) -> PipelineResult<()> {
        let _guard = self.begin().await?;
        let generation = self.root_generation.load(Ordering::SeqCst);

        let current = self.snapshot();
        let result = self
            .engine()
            .reprocess_until(&current, || self.superseded(generation))
            .await;

        match result {
            Ok(pipeline) => {
                self.publish(pipeline);
                Ok(())
            }
            Err(failure) => Err(self.publish_partial(failure)),
        }
    }

    fn engine(&self) -> ReprocessingEngine<'_> {
        ReprocessingEngine::new(&self.registry, &self.ids)
    }

    fn superseded(&self, generation: u64) -> bool {
        self.root_generation.load(Ordering::SeqCst) != generation
    }

    async fn begin(&self) -> PipelineResult<MutexGuard<'_, ()>> {
        match self.busy_policy {
            BusyPolicy::Queue => Ok(self.mutation.lock().await),
            BusyPolicy::Reject => self.try_begin(),
        }
    }

    fn try_begin(&self) -> PipelineResult<MutexGuard<'_, ()>> {
        self.mutation
            .try_lock()
            .map_err(|_| PipelineError::PipelineBusy)
    }

    fn publish(&self, pipeline: Pipeline) {
        debug_assert!(pipeline.check_chain().is_ok(), "{:?}", pipeline.check_chain());
        self.state.send_replace(Arc::new(pipeline));
    }

    /// Publish whatever a failed pass managed, then hand back its error.
    fn publish_partial(&self, failure: ReprocessFailure) -> PipelineError {
        if let Some(partial) = failure.partial {
            self.publish(partial);
        }
        failure.error
    }
}
