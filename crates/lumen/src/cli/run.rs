//! The `lumen run` command: build a pipeline from one source image.

use clap::{Args, ValueEnum};
use lumen_core::output::OutputFormat as CoreOutputFormat;
use lumen_core::{
    Config, ImageStore, LocalDirStore, OutputWriter, PipelineError, SnapshotRecord, SourceLoader,
    StepOptions, Workflow,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source image: a file path or a `data:` URL
    #[arg(required = true)]
    pub input: String,

    /// Operation to append at the end of the chain (repeatable, applied in order)
    #[arg(short, long = "step", value_name = "OP")]
    pub steps: Vec<String>,

    /// Delete the step at this chain position after all steps are applied
    /// (repeatable, each index refers to the chain as it is at that point)
    #[arg(long = "remove", value_name = "INDEX")]
    pub removals: Vec<usize>,

    /// Export every image to the configured storage directory
    #[arg(long)]
    pub save: bool,

    /// Embed each image as a data URL in the output
    #[arg(long)]
    pub include_payloads: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per image (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    run(args, &config).await
}

async fn run(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    let workflow = Workflow::new(config);
    let loader = SourceLoader::new(config.limits.clone());

    let root = if args.input.starts_with("data:") {
        loader.from_data_url(&args.input)?
    } else {
        loader.from_path(args.input.as_ref()).await?
    };
    workflow.set_root(root).await?;
    tracing::info!("Loaded {}", args.input);

    apply_steps(&workflow, &args.steps).await?;

    for &index in &args.removals {
        let snapshot = workflow.snapshot();
        let Some(step) = snapshot.steps().get(index) else {
            anyhow::bail!(
                "No step at index {} (pipeline has {} step(s))",
                index,
                snapshot.len()
            );
        };
        match workflow.remove_step(step.output().id()).await {
            Ok(_) => tracing::info!("Removed step {} ({})", index, step.operation()),
            // The partially reprocessed chain is committed; report and keep going.
            Err(e @ PipelineError::StepFailed { .. }) => tracing::warn!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    let snapshot = workflow.snapshot();
    let include_payloads = args.include_payloads || config.output.include_payloads;
    let mut record = SnapshotRecord::new(&snapshot, include_payloads);

    if args.save {
        let store = LocalDirStore::from_config(config);
        for image in snapshot.nodes() {
            let url = store.save(image).await?;
            record.set_url(image.id(), url);
        }
        tracing::info!(
            "Exported {} image(s) to {:?} ({})",
            snapshot.nodes().len(),
            store.dir(),
            store.name()
        );
    }

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let pretty = args.pretty || config.output.pretty;
    let mut writer = OutputWriter::new(sink, args.format.into(), pretty);
    writer.write_snapshot(&record)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }
    Ok(())
}

/// Append each operation at the current end of the chain.
async fn apply_steps(workflow: &Workflow, steps: &[String]) -> anyhow::Result<()> {
    if steps.is_empty() {
        return Ok(());
    }

    let progress = create_progress_bar(steps.len() as u64);
    for name in steps {
        progress.set_message(name.clone());
        let end = workflow
            .snapshot()
            .terminal_image()
            .map(|image| image.id().clone())
            .ok_or_else(|| anyhow::anyhow!("Pipeline has no root image"))?;
        if let Err(e) = workflow.add_step(&end, name, StepOptions::new()).await {
            progress.abandon();
            return Err(e.into());
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    tracing::info!("Applied {} step(s)", steps.len());
    Ok(())
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    pb
}
