//! Image info command.
//!
//! Sniffs and decodes each input, then prints geometry and colour details.

use crate::InfoArgs;
use anyhow::{Context, Result};
use imgpipe::{sniff, ImageHandle, Runtime};
use serde_json::json;
use std::path::Path;
use tracing::trace;

/// Runs the info command.
pub fn run(args: InfoArgs, runtime: &Runtime) -> Result<()> {
    for path in &args.input {
        trace!(path = %path.display(), "info::run");
        let bytes = super::read_input(path)?;
        let image = ImageHandle::load(runtime, &bytes)
            .map(|(image, _)| image)
            .with_context(|| format!("Failed to load: {}", path.display()))?;

        if args.json {
            println!("{}", describe_json(path, &bytes, &image));
        } else {
            print_text(path, &bytes, &image);
            if args.input.len() > 1 {
                println!();
            }
        }
    }
    Ok(())
}

fn print_text(path: &Path, bytes: &[u8], image: &ImageHandle) {
    println!("{}", path.display());
    println!("  Format:      {}", sniff(bytes));
    println!("  Resolution:  {}x{}", image.width(), image.height());
    println!("  Bands:       {}", image.bands());
    println!("  Space:       {}", image.space());
    println!("  Alpha:       {}", if image.has_alpha() { "yes" } else { "no" });
    println!("  ICC profile: {}", if image.has_profile() { "yes" } else { "no" });
    if image.exif_orientation() != 0 {
        println!("  Orientation: {}", image.exif_orientation());
    }
    println!("  File size:   {}", super::format_size(bytes.len() as u64));
}

fn describe_json(path: &Path, bytes: &[u8], image: &ImageHandle) -> serde_json::Value {
    json!({
        "path": path.display().to_string(),
        "format": sniff(bytes).name(),
        "width": image.width(),
        "height": image.height(),
        "bands": image.bands(),
        "space": image.space(),
        "alpha": image.has_alpha(),
        "profile": image.has_profile(),
        "orientation": image.exif_orientation(),
        "size": bytes.len(),
    })
}
