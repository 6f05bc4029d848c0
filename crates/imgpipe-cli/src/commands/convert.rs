//! Format conversion command.

use crate::ConvertArgs;
use anyhow::{Context, Result};
use imgpipe::{save, ImageHandle, Runtime, SaveOptions};
use tracing::{info, trace};

/// Runs the convert command: load, normalize, encode.
pub fn run(args: ConvertArgs, runtime: &Runtime, verbose: bool) -> Result<()> {
    trace!(input = %args.input.display(), output = %args.output.display(), "convert::run");

    let opts = super::save_options(&args.save, &args.output, SaveOptions::default())?;
    let bytes = super::read_input(&args.input)?;
    let (image, format) = ImageHandle::load(runtime, &bytes)
        .with_context(|| format!("Failed to load: {}", args.input.display()))?;

    info!(
        input = %args.input.display(),
        input_format = %format,
        output = %args.output.display(),
        output_format = %opts.format,
        "Converting image"
    );
    if verbose {
        println!(
            "Converting {} ({}) -> {} ({})",
            args.input.display(),
            format,
            args.output.display(),
            opts.format
        );
    }

    let out = save(image, &opts).with_context(|| format!("Failed to encode: {}", args.output.display()))?;
    super::write_output(&args.output, &out)?;

    if verbose {
        println!("Done: {}", super::format_size(out.len() as u64));
    }
    Ok(())
}
