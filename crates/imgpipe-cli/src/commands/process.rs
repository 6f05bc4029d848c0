//! Pipeline command: runs a JSON pipeline description on one image.

use crate::ProcessArgs;
use anyhow::{Context, Result};
use imgpipe::{Pipeline, Runtime};
use tracing::{debug, trace};

/// Runs the process command.
pub fn run(args: ProcessArgs, runtime: &Runtime, verbose: bool) -> Result<()> {
    trace!(input = %args.input.display(), pipeline = %args.pipeline.display(), "process::run");

    let text = std::fs::read_to_string(&args.pipeline)
        .with_context(|| format!("Failed to read pipeline: {}", args.pipeline.display()))?;
    let mut pipeline: Pipeline = serde_json::from_str(&text)
        .with_context(|| format!("Invalid pipeline: {}", args.pipeline.display()))?;
    pipeline.save = super::save_options(&args.save, &args.output, pipeline.save)?;
    debug!(steps = pipeline.operations.len(), format = %pipeline.save.format, "pipeline loaded");

    if verbose {
        let names: Vec<_> = pipeline.operations.iter().map(|op| op.name()).collect();
        println!("Pipeline: {}", if names.is_empty() { "(none)".to_string() } else { names.join(" -> ") });
    }

    let bytes = super::read_input(&args.input)?;
    let out = pipeline
        .process(runtime, &bytes)
        .with_context(|| format!("Pipeline failed on {}", args.input.display()))?;
    super::write_output(&args.output, &out)?;

    if verbose {
        println!("Wrote {} ({})", args.output.display(), super::format_size(out.len() as u64));
    }
    Ok(())
}
