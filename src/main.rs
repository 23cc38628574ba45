use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use kkscene2vmd::{convert_file, write_scene_dump, ConvertOptions, PluginStage, TimelineStage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Convert a Koikatsu studio scene card into MMD motion files
#[derive(Parser)]
#[command(name = "kkscene2vmd")]
#[command(version)]
struct Cli {
    /// Scene card (.png) to convert
    input: PathBuf,

    /// Directory for the .vmd files (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Model name written into the motion header
    #[arg(long, default_value = kkscene2vmd::vmd::DEFAULT_MODEL_NAME)]
    model_name: String,

    /// Byte offset of the scene data, skipping PNG detection
    #[arg(long)]
    image_offset: Option<u64>,

    /// Read the extended data right after the object list
    #[arg(long)]
    no_scene_settings: bool,

    /// Also write the parsed scene as <stem>.scene.json
    #[arg(long)]
    dump_json: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if !cli.input.is_file() {
        bail!("Input file not found: {}", cli.input.display());
    }

    let options = ConvertOptions {
        model_name: cli.model_name,
        output_dir: cli.output_dir,
        image_offset: cli.image_offset,
        skip_scene_settings: !cli.no_scene_settings,
        ..Default::default()
    };

    let report = convert_file(&cli.input, &options)
        .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    if cli.dump_json {
        write_scene_dump(&report, &cli.input, &options).context("Failed to write scene dump")?;
    }

    match (&report.plugins, &report.timeline) {
        (PluginStage::Failed(reason), _) => warn!("Extended data could not be read: {}", reason),
        (_, TimelineStage::Compiled(_)) => {
            info!("Done: {} motion file(s) written", report.written.len())
        }
        _ => info!("Done: scene has no exportable motion"),
    }
    Ok(())
}
