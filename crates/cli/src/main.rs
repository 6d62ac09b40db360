mod metrics;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use footage_core::{
    frames::encode_png, load_config, validate_config, Config, ConfigError, MediaItem,
    MediaPipeline, ProcessingResult,
};

/// Default configuration file, used when present.
const DEFAULT_CONFIG: &str = "footage.toml";

/// Extract frames, a transcript and tags from video files.
#[derive(Debug, Parser)]
#[command(name = "footage", version, about)]
struct Args {
    /// Media files to process.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (TOML). Overrides are read from FOOTAGE_* variables.
    #[arg(short, long, env = "FOOTAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Write extracted frames as PNG files under this directory.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Items processed in parallel (defaults to pipeline.max_concurrent_items).
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics to stderr when done.
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.json_logs);

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args) -> Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = config.sanitized();
    info!(
        "Configuration: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    let pipeline = MediaPipeline::from_config(&config);
    for (stage, names) in pipeline.strategies() {
        if names.is_empty() {
            warn!("{}: no strategy configured, only the fallback will run", stage);
        } else {
            info!("{}: {}", stage, names.join(" -> "));
        }
    }

    let items = args
        .paths
        .iter()
        .map(|path| media_item(path))
        .collect::<Result<Vec<_>>>()?;

    let limit = args
        .concurrency
        .unwrap_or(config.pipeline.max_concurrent_items);
    let results = pipeline.process_many(&items, limit).await;

    if let Some(dir) = &args.frames_dir {
        for result in &results {
            write_frames(dir, result).await?;
        }
    }

    for result in &results {
        println!(
            "{}",
            serde_json::to_string(result).context("Failed to serialize result")?
        );
    }

    if args.metrics {
        eprint!("{}", metrics::encode_metrics()?);
    }

    Ok(())
}

/// Loads the requested file, or `footage.toml` when present, or defaults.
fn resolve_config(requested: Option<&Path>) -> Result<Config> {
    let path = requested.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
    match load_config(path) {
        Ok(config) => {
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        Err(ConfigError::FileNotFound(_)) if requested.is_none() => {
            info!("No {} found, using defaults", DEFAULT_CONFIG);
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config from {:?}", path)),
    }
}

fn media_item(path: &Path) -> Result<MediaItem> {
    if !path.is_file() {
        bail!("Not a file: {}", path.display());
    }
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(MediaItem::new(id, path))
}

/// Writes `<dir>/<media_id>/frame-<index>.png` for every frame.
async fn write_frames(dir: &Path, result: &ProcessingResult) -> Result<()> {
    let target = dir.join(&result.media_id);
    tokio::fs::create_dir_all(&target)
        .await
        .with_context(|| format!("Failed to create {:?}", target))?;

    for frame in &result.frames {
        let png = encode_png(frame)
            .with_context(|| format!("Failed to encode frame {} of {}", frame.index, result.media_id))?;
        let path = target.join(format!("frame-{:02}.png", frame.index));
        tokio::fs::write(&path, png)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
    }
    info!(
        "Wrote {} frame(s) for {} to {:?}",
        result.frames.len(),
        result.media_id,
        target
    );
    Ok(())
}
