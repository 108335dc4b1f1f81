use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use depth_store::{read_dump, render::render_dump, DUMP_FILE_NAME};
use scene_controller::config::load_settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Writes a colour-mapped PNG for every frame of a depth dump.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "scene_office")]
    scene: String,
    /// Subdirectory of the scene output the PNGs are written to.
    #[arg(long, default_value = "vr")]
    name: String,
    /// Defaults to `<output-root>/<scene>/output.npy`.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    output_root: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(v) = args.output_root {
        settings.output_root = v;
    }

    let scene_dir = settings.scene_dir(&args.scene);
    let input = args.input.unwrap_or_else(|| scene_dir.join(DUMP_FILE_NAME));
    let dump = read_dump(&input).with_context(|| format!("reading {}", input.display()))?;
    info!(path = %input.display(), shape = ?dump.shape(), "loaded depth dump");

    let written = render_dump(&dump, &scene_dir.join(&args.name))?;
    info!(frames = written.len(), "depth frames rendered");
    Ok(())
}
