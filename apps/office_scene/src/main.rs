use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog::ModelLibrarian;
use clap::Parser;
use depth_store::DepthBufferScope;
use engine_client::WsEngineClient;
use rand::{rngs::StdRng, SeedableRng};
use scene_controller::{
    config::load_settings,
    office::{OfficeOptions, OfficeProps, OfficeScene, DEFAULT_CUP, NO_PROP},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Furnished office trials. Right trigger ends a trial, left trigger quits and
/// writes the depth dump.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = DEFAULT_CUP)]
    cup: String,
    #[arg(long, default_value = NO_PROP)]
    fruit: String,
    #[arg(long, default_value = NO_PROP)]
    book: String,
    #[arg(long, default_value = NO_PROP)]
    pen: String,
    #[arg(long)]
    engine_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    buffer_scope: Option<DepthBufferScope>,
    /// Librarian records file, layered over the bundled records.
    #[arg(long)]
    librarian: Option<PathBuf>,
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
    if let Some(v) = args.buffer_scope {
        settings.depth_buffer_scope = v;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if args.librarian.is_some() {
        settings.librarian_path = args.librarian;
    }

    let mut librarian = ModelLibrarian::builtin();
    if let Some(path) = &settings.librarian_path {
        librarian.merge(ModelLibrarian::load(path)?);
    }
    let rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let props = OfficeProps::from_args(&args.cup, &args.fruit, &args.book, &args.pen);

    let client = WsEngineClient::connect(&settings.engine_url)
        .await
        .with_context(|| {
            format!(
                "is the engine bridge listening on {}?",
                settings.engine_url
            )
        })?;
    info!(
        engine = %settings.engine_url,
        output = %settings.output_root.display(),
        scope = %settings.depth_buffer_scope,
        "connected"
    );

    let mut scene = OfficeScene::new(
        client,
        librarian,
        props,
        OfficeOptions::from_settings(&settings),
        rng,
    )
    .await?;
    let summary = scene.run().await?;

    info!(
        trials = summary.trials,
        frames = summary.frames_dumped,
        dump = ?summary.dump_path,
        "simulation finished"
    );
    Ok(())
}
