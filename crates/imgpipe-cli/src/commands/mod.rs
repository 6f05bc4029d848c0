//! CLI command implementations

pub mod convert;
pub mod info;
pub mod memory;
pub mod process;

use anyhow::{bail, Context, Result};
use imgpipe::{is_type_name_supported_save, ImageFormat, SaveOptions};
use std::fs;
use std::path::Path;

use crate::SaveArgs;

/// Read an input file
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))
}

/// Write an output file
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write: {}", path.display()))
}

/// Output format from an explicit name or the output extension.
pub fn output_format(name: Option<&str>, output: &Path) -> Result<ImageFormat> {
    let name = match name {
        Some(name) => name.to_ascii_lowercase(),
        None => output
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .with_context(|| format!("Cannot tell output format of {}, use --format", output.display()))?,
    };
    let name = if name == "jpg" { "jpeg".to_string() } else { name };
    if !is_type_name_supported_save(&name) {
        bail!("Unsupported output format: {name} (jpeg, png and webp can be written)");
    }
    ImageFormat::from_name(&name).with_context(|| format!("Unknown format: {name}"))
}

/// Applies command-line save flags on top of `base`.
pub fn save_options(args: &SaveArgs, output: &Path, base: SaveOptions) -> Result<SaveOptions> {
    let mut opts = base;
    opts.format = output_format(args.format.as_deref(), output)?;
    if let Some(quality) = args.quality {
        opts.quality = quality;
    }
    if let Some(compression) = args.compression {
        opts.compression = compression;
    }
    opts.interlace |= args.interlace;
    opts.strip_profile |= args.strip;
    Ok(opts)
}

/// Format file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(output_format(None, Path::new("a/b.JPG")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(output_format(None, Path::new("b.png")).unwrap(), ImageFormat::Png);
        assert_eq!(output_format(Some("webp"), Path::new("b.png")).unwrap(), ImageFormat::Webp);
        assert!(output_format(None, Path::new("b.tiff")).is_err());
        assert!(output_format(None, Path::new("noext")).is_err());
    }

    #[test]
    fn flags_override_base() {
        let args = SaveArgs {
            format: None,
            quality: Some(95),
            compression: None,
            interlace: true,
            strip: false,
        };
        let base = SaveOptions::default().with_compression(2);
        let opts = save_options(&args, Path::new("x.png"), base).unwrap();
        assert_eq!(opts.format, ImageFormat::Png);
        assert_eq!(opts.quality, 95);
        assert_eq!(opts.compression, 2);
        assert!(opts.interlace);
        assert!(!opts.strip_profile);
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
