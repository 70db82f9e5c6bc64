//! The pipeline graph: a root image and a linear chain of steps.
//!
//! `Pipeline` is a plain value. It never runs operations itself; the
//! [`Workflow`](crate::workflow::Workflow) executes them and then hands the
//! result to the structural edits here (`push_step`, `unlink_step`,
//! `replace_root`). Readers get it as an immutable [`PipelineSnapshot`].
//!
//! Invariant: step 0 consumes the root and step *i* consumes the output of
//! step *i - 1*. Every edit below preserves it.

pub mod ids;

pub use ids::IdGenerator;

use serde::Serialize;
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::operations::Operation;
use crate::types::{Image, ImageId, Step};

/// Read-only view handed to renderers and other consumers.
pub type PipelineSnapshot = Arc<Pipeline>;

/// One edge of the chain, for graph renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: ImageId,
    pub to: ImageId,
    pub operation: Operation,
}

/// Ordered chain of steps rooted at one source image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    root: Option<Image>,
    steps: Vec<Step>,
}

impl Pipeline {
    /// An empty pipeline with no root.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline with the given root and no steps.
    pub fn with_root(root: Image) -> Self {
        Self {
            root: Some(root),
            steps: Vec::new(),
        }
    }

    pub(crate) fn from_parts(root: Option<Image>, steps: Vec<Step>) -> Self {
        Self { root, steps }
    }

    pub fn root(&self) -> Option<&Image> {
        self.root.as_ref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look an image up by identifier: the root first, then step outputs in
    /// chain order.
    pub fn resolve_image(&self, id: &ImageId) -> Option<&Image> {
        if let Some(root) = self.root.as_ref().filter(|root| root.id() == id) {
            return Some(root);
        }
        self.steps
            .iter()
            .flat_map(Step::output_images)
            .find(|image| image.id() == id)
    }

    /// Whether `id` names an existing image that no step consumes yet.
    ///
    /// Unknown identifiers are not terminal. With zero steps the root is the
    /// only terminal image.
    pub fn is_terminal(&self, id: &ImageId) -> bool {
        self.resolve_image(id).is_some() && !self.steps.iter().any(|step| step.input_id() == id)
    }

    /// The end of the chain: the last step's output, or the root.
    pub fn terminal_image(&self) -> Option<&Image> {
        self.steps
            .last()
            .map(Step::output)
            .or(self.root.as_ref())
    }

    /// The step producing `output_id`, with its position in the chain.
    pub fn find_step(&self, output_id: &ImageId) -> Option<(usize, &Step)> {
        self.steps
            .iter()
            .enumerate()
            .find(|(_, step)| step.output().id() == output_id)
    }

    /// Every image, root first, in chain order.
    pub fn nodes(&self) -> Vec<&Image> {
        self.root
            .iter()
            .chain(self.steps.iter().map(Step::output))
            .collect()
    }

    /// Input-to-output edges in chain order.
    pub fn edges(&self) -> Vec<Edge> {
        self.steps
            .iter()
            .map(|step| Edge {
                from: step.input_id().clone(),
                to: step.output().id().clone(),
                operation: step.operation(),
            })
            .collect()
    }

    /// All identifiers currently in the pipeline.
    pub fn image_ids(&self) -> Vec<&ImageId> {
        self.nodes().into_iter().map(Image::id).collect()
    }

    /// Check the chain invariant, describing the first violation found.
    pub fn check_chain(&self) -> Result<(), String> {
        let Some(root) = &self.root else {
            return if self.steps.is_empty() {
                Ok(())
            } else {
                Err("steps present without a root image".to_string())
            };
        };

        let mut expected = root.id();
        for (index, step) in self.steps.iter().enumerate() {
            if step.input_id() != expected {
                return Err(format!(
                    "step {} consumes {} but the previous image is {}",
                    index,
                    step.input_id(),
                    expected
                ));
            }
            expected = step.output().id();
        }
        Ok(())
    }

    /// Replace the root. Steps are kept; their outputs are stale until the
    /// pipeline is reprocessed.
    pub(crate) fn replace_root(&mut self, root: Image) {
        self.root = Some(root);
    }

    /// Append a step whose input must be the current terminal image.
    pub(crate) fn push_step(&mut self, step: Step) -> PipelineResult<()> {
        let input_id = step.input_id();
        if self.resolve_image(input_id).is_none() {
            return Err(PipelineError::UnknownImage(input_id.clone()));
        }
        if !self.is_terminal(input_id) {
            return Err(PipelineError::NotTerminal(input_id.clone()));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Remove the step producing `output_id` and relink its successor to the
    /// removed step's input. Returns `None` if no step produces `output_id`.
    pub(crate) fn unlink_step(&mut self, output_id: &ImageId) -> Option<Step> {
        let (index, _) = self.find_step(output_id)?;
        let removed = self.steps.remove(index);
        if let Some(next) = self.steps.get_mut(index) {
            *next = next.clone().relinked(removed.input_id().clone());
        }
        Some(removed)
    }
}
