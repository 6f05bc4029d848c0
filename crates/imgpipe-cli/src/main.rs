//! imgpipe - image pipeline CLI
//!
//! Loads images, runs operation pipelines and reports engine state.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "imgpipe")]
#[command(author, version, about = "Image pipeline CLI")]
#[command(long_about = "
Runs images through the imgpipe engine.

Examples:
  imgpipe info photo.jpg                     # Format, size, colour space
  imgpipe info a.png b.webp --json           # Machine-readable output
  imgpipe convert photo.jpg photo.png        # Format from the output extension
  imgpipe convert in.png out.jpg -q 90 --strip
  imgpipe process in.jpg out.webp -p steps.json
  imgpipe memory                             # Engine memory and cache state

Environment:
  IMGPIPE_CONCURRENCY   engine worker threads (default 1)
  IMGPIPE_TRACE         any value enables operation cache tracing
  RUST_LOG              log filter, e.g. imgpipe=debug
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Display image information
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Re-encode an image
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Run a JSON pipeline description on an image
    #[command(visible_alias = "p")]
    Process(ProcessArgs),

    /// Show engine memory statistics and internal state
    Memory(MemoryArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input image(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SaveArgs {
    /// Output format: jpeg, png, webp (default: from output extension)
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Quality (0-100, JPEG)
    #[arg(short = 'q', long)]
    quality: Option<i32>,

    /// Compression level (0-9, PNG)
    #[arg(short = 'c', long)]
    compression: Option<i32>,

    /// Progressive/interlaced output
    #[arg(long)]
    interlace: bool,

    /// Drop embedded ICC profiles
    #[arg(long)]
    strip: bool,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    output: PathBuf,

    #[command(flatten)]
    save: SaveArgs,
}

#[derive(Args)]
struct ProcessArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    output: PathBuf,

    /// Pipeline description (JSON file)
    #[arg(short, long)]
    pipeline: PathBuf,

    #[command(flatten)]
    save: SaveArgs,
}

#[derive(Args)]
struct MemoryArgs {
    /// Also dump internal engine state to stderr
    #[arg(short, long)]
    dump: bool,

    /// Drop the operation cache before reporting
    #[arg(long)]
    drop_cache: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = imgpipe::Runtime::global();
    runtime.initialize().context("Failed to start image engine")?;

    let result = match cli.command {
        Commands::Info(args) => commands::info::run(args, runtime),
        Commands::Convert(args) => commands::convert::run(args, runtime, cli.verbose),
        Commands::Process(args) => commands::process::run(args, runtime, cli.verbose),
        Commands::Memory(args) => commands::memory::run(args, runtime),
    };

    runtime.shutdown();
    result
}
