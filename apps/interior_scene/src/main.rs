use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use engine_client::WsEngineClient;
use scene_controller::{
    config::load_settings,
    interior::{load_init_commands, InteriorOptions, InteriorScene, DEFAULT_INIT_COMMANDS},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Renders the kitchen interior under each HDRI skybox and dumps its depth.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    engine_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_INIT_COMMANDS)]
    init_commands: PathBuf,
    /// Skybox index to render; repeat for several. Every skybox when omitted.
    #[arg(long = "skybox")]
    skyboxes: Vec<usize>,
    #[arg(long)]
    output_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(v) = args.engine_url {
        settings.engine_url = v;
    }
    if let Some(v) = args.output_root {
        settings.output_root = v;
    }

    let init_commands = load_init_commands(&args.init_commands)?;
    let client = WsEngineClient::connect(&settings.engine_url)
        .await
        .with_context(|| {
            format!(
                "is the engine bridge listening on {}?",
                settings.engine_url
            )
        })?;

    let options = InteriorOptions::from_settings(&settings);
    let mut scene = InteriorScene::new(client, init_commands, options).await?;
    let skyboxes = if args.skyboxes.is_empty() {
        (0..scene.skybox_names().len()).collect()
    } else {
        args.skyboxes
    };
    let summary = scene.show_skyboxes(&skyboxes).await?;

    info!(
        skyboxes = summary.trials,
        frames = summary.frames_dumped,
        dump = ?summary.dump_path,
        "interior capture finished"
    );
    Ok(())
}
