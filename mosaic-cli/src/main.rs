mod fetcher;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mosaic_common::form_data::CompositeConfig;
use mosaic_common::types::Viewport;
use mosaic_guides::legend::Legend;
use mosaic_runtime::layers::{RenderLayer, SummaryLayerGenerator};
use mosaic_runtime::time_window::PlaybackInput;
use mosaic_runtime::MultiSliceCompositor;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::fetcher::FileFetcher;

/// Mosaic CLI for running multi-layer map composites
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a composite and print its legends, playback window and layers
    Run {
        /// Path to the composite configuration (.json)
        config: PathBuf,

        /// Directory holding one `<slice_id>.json` payload per slice
        #[arg(short, long)]
        payloads: PathBuf,

        /// Playback position in epoch milliseconds (defaults to the start of the window)
        #[arg(short, long)]
        time: Option<i64>,

        /// Map zoom used for clustered labels
        #[arg(short, long)]
        zoom: Option<f64>,

        /// Seconds to wait for every slice to load
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

fn read_config(path: &Path) -> anyhow::Result<CompositeConfig> {
    if path.is_dir() {
        bail!("Config path is a directory: {}", path.display());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn print_legend(legend: &Legend) {
    if let Some(title) = &legend.title {
        println!("  {title}");
    }
    for entry in &legend.entries {
        println!("    {} {} {}", entry.icon, entry.label, entry.css_color);
    }
}

async fn run(
    config_path: &Path,
    payloads: &Path,
    time: Option<i64>,
    zoom: Option<f64>,
    timeout: Duration,
) -> anyhow::Result<()> {
    let config = read_config(config_path)?;
    info!(slices = config.slices.len(), "loaded composite configuration");

    let fetcher = Arc::new(FileFetcher::new(payloads));
    let mut compositor = MultiSliceCompositor::try_new(config, fetcher, SummaryLayerGenerator)?;
    compositor.load();

    let state = tokio::time::timeout(timeout, compositor.wait_ready())
        .await
        .context("Timed out waiting for slices to load")??;
    for (slice_id, err) in state.failed() {
        println!("slice {slice_id} failed: {err}");
    }

    if let Some(zoom) = zoom {
        compositor.set_viewport(Viewport {
            zoom,
            ..state.viewport
        });
    }

    let window = &state.time_window;
    if window.disabled {
        println!("playback: disabled");
    } else {
        let values = match time {
            Some(t) => compositor.set_playback(PlaybackInput::Position(t))?,
            None => state.values,
        };
        println!(
            "playback: [{}, {}] showing [{}, {}]",
            window.start, window.end, values[0], values[1]
        );
    }

    println!("legends:");
    for slice_legend in compositor.legends() {
        print_legend(&slice_legend.legend);
    }

    println!("layers:");
    for layer in compositor.get_layers(None) {
        match layer {
            RenderLayer::Slice { layer, .. } => {
                println!("  {}", serde_json::to_string(&layer)?);
            }
            RenderLayer::Marker(marker) => {
                println!("  {} at {:?}", marker.id, marker.position);
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            config,
            payloads,
            time,
            zoom,
            timeout,
        } => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;
            rt.block_on(run(
                &config,
                &payloads,
                time,
                zoom,
                Duration::from_secs(timeout),
            ))
        }
    }
}
