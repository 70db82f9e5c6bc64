//! Output formatting for pipeline snapshots.
//!
//! A [`SnapshotRecord`] is the serializable view of a pipeline. It is
//! written either as one JSON document or as JSON Lines with one record per
//! image (root first, then each step in chain order).

use serde::Serialize;
use std::io::{self, Write};

use crate::graph::{Edge, Pipeline};
use crate::operations::Operation;
use crate::types::{Image, ImageId, StepOptions};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

/// One image, without its payload unless payloads were requested.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub mime_type: String,
    pub size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    /// Where the image was exported to, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ImageRecord {
    pub fn new(image: &Image, include_payload: bool) -> Self {
        Self {
            id: image.id().clone(),
            mime_type: image.mime_type().to_string(),
            size_bytes: image.bytes().len(),
            data_url: include_payload.then(|| image.to_data_url()),
            url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub input_id: ImageId,
    pub operation: Operation,
    #[serde(skip_serializing_if = "StepOptions::is_empty")]
    pub options: StepOptions,
    pub output: ImageRecord,
}

/// Per-image line in JSON Lines output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRecord<'a> {
    Root(&'a ImageRecord),
    Step(&'a StepRecord),
}

/// Serializable view of a whole pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRecord {
    pub root: Option<ImageRecord>,
    pub steps: Vec<StepRecord>,
    pub edges: Vec<Edge>,
}

impl SnapshotRecord {
    pub fn new(pipeline: &Pipeline, include_payloads: bool) -> Self {
        Self {
            root: pipeline
                .root()
                .map(|root| ImageRecord::new(root, include_payloads)),
            steps: pipeline
                .steps()
                .iter()
                .enumerate()
                .map(|(index, step)| StepRecord {
                    index,
                    input_id: step.input_id().clone(),
                    operation: step.operation(),
                    options: step.options().clone(),
                    output: ImageRecord::new(step.output(), include_payloads),
                })
                .collect(),
            edges: pipeline.edges(),
        }
    }

    /// Attach an export URL to the image `id`. Returns false if unknown.
    pub fn set_url(&mut self, id: &ImageId, url: String) -> bool {
        let record = self
            .root
            .iter_mut()
            .chain(self.steps.iter_mut().map(|step| &mut step.output))
            .find(|record| &record.id == id);
        match record {
            Some(record) => {
                record.url = Some(url);
                true
            }
            None => false,
        }
    }

    /// Root first, then steps in chain order.
    pub fn nodes(&self) -> Vec<NodeRecord<'_>> {
        self.root
            .iter()
            .map(NodeRecord::Root)
            .chain(self.steps.iter().map(NodeRecord::Step))
            .collect()
    }
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            // JSONL is never pretty-printed (one object per line)
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a snapshot: the whole document for JSON, one node per line
    /// for JSONL.
    pub fn write_snapshot(&mut self, snapshot: &SnapshotRecord) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.write(snapshot),
            OutputFormat::JsonLines => {
                for node in snapshot.nodes() {
                    self.write(&node)?;
                }
                Ok(())
            }
        }
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
