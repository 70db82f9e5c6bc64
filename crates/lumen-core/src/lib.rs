//! Lumen Core - embeddable image workflow engine.
//!
//! Lumen feeds one source image through a linear chain of transformation
//! steps and keeps every intermediate result addressable by identifier.
//!
//! # Architecture
//!
//! ```text
//! root ─▶ step 0 ─▶ step 1 ─▶ … ─▶ terminal image
//! ```
//!
//! Each step is decode → transform → encode. Replacing the root or deleting
//! a step reprocesses the chain in order, minting fresh identifiers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, ImageId, SourceLoader, StepOptions, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let config = Config::load()?;
//!     let workflow = Workflow::new(&config);
//!
//!     let root = SourceLoader::new(config.limits.clone())
//!         .from_path("./image.png".as_ref())
//!         .await?;
//!     workflow.set_root(root).await?;
//!     let step = workflow
//!         .add_step(&ImageId::root(), "grayscale", StepOptions::new())
//!         .await?;
//!     println!("{}", step.output().id());
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod operations;
pub mod output;
pub mod source;
pub mod storage;
pub mod types;
pub mod workflow;

pub use config::Config;
pub use engine::ReprocessingEngine;
pub use error::{ConfigError, LumenError, PipelineError, PipelineResult, Result, StorageError};
pub use graph::{Pipeline, PipelineSnapshot};
pub use operations::{Operation, OperationRegistry};
pub use output::{OutputFormat, OutputWriter, SnapshotRecord};
pub use source::SourceLoader;
pub use storage::{ImageStore, LocalDirStore};
pub use types::{EncodedImage, Image, ImageId, Step, StepOptions};
pub use workflow::Workflow;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
