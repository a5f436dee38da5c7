//! terrashape CLI - Terrain Shape Index for plot layers

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use terrashape_algorithms::sampling::SampleMethod;
use terrashape_algorithms::tsi::{run_tsi, TsiParams};
use terrashape_core::io::{read_geotiff, read_points, write_points, WriteOptions};
use terrashape_core::{PointCollection, PointStore, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "terrashape")]
#[command(author, version, about = "Terrain Shape Index for plot points", long_about = None)]
struct Cli {
    /// Plot points (GeoJSON FeatureCollection of Points)
    plots: PathBuf,
    /// Distance from each plot to its cardinal points, in CRS units
    #[arg(allow_negative_numbers = true)]
    radius: f64,
    /// Elevation surface (single-band GeoTIFF)
    surface: PathBuf,
    /// Output file for the generated cardinal points (GeoJSON)
    cardinal_output: PathBuf,

    /// Directory that relative paths are resolved against
    #[arg(short, long)]
    workspace: Option<PathBuf>,
    /// Sampling method: nearest, bilinear
    #[arg(short, long, default_value = "nearest")]
    method: String,
    /// Write the updated plots here instead of rewriting the input
    #[arg(long)]
    plots_output: Option<PathBuf>,
    /// Fail instead of replacing existing output files
    #[arg(long)]
    no_overwrite: bool,
    /// Pretty-print GeoJSON output
    #[arg(long)]
    pretty: bool,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install logging subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_method(method: &str) -> Result<SampleMethod> {
    match method.to_lowercase().as_str() {
        "nearest" | "cell" | "n" => Ok(SampleMethod::Nearest),
        "bilinear" | "linear" | "b" => Ok(SampleMethod::Bilinear),
        _ => anyhow::bail!("Unknown sampling method: {}. Use nearest or bilinear.", method),
    }
}

/// Resolve `path` against the workspace directory when it is relative
fn resolve(workspace: Option<&Path>, path: &Path) -> PathBuf {
    match workspace {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn read_plots(path: &Path) -> Result<PointCollection> {
    let pb = spinner("Reading plots...");
    let plots = read_points(path, "plots")
        .with_context(|| format!("Failed to read plots from {}", path.display()))?;
    pb.finish_and_clear();
    info!("{} plots read from {}", plots.len(), path.display());
    if let Some(crs) = plots.crs() {
        info!("Plots CRS: {}", crs);
    }
    Ok(plots)
}

fn read_surface(path: &Path) -> Result<Raster> {
    let pb = spinner("Reading elevation surface...");
    let surface = read_geotiff(path)
        .with_context(|| format!("Failed to read elevation surface from {}", path.display()))?;
    pb.finish_and_clear();
    let (rows, cols) = surface.shape();
    info!("Surface: {} x {} cells from {}", cols, rows, path.display());
    Ok(surface)
}

/// Fail if `path` exists and `options` forbid replacing it
fn check_writable(path: &Path, options: &WriteOptions) -> Result<()> {
    if path.exists() && !options.overwrite {
        anyhow::bail!("Output {} already exists (--no-overwrite)", path.display());
    }
    Ok(())
}

fn write_layer(layer: &PointCollection, path: &Path, options: &WriteOptions) -> Result<()> {
    let pb = spinner(&format!("Writing {}...", layer.name()));
    write_points(layer, path, options)
        .with_context(|| format!("Failed to write {} to {}", layer.name(), path.display()))?;
    pb.finish_and_clear();
    println!("{} saved to: {}", layer.name(), path.display());
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let workspace = cli.workspace.as_deref();
    let plots_path = resolve(workspace, &cli.plots);
    let surface_path = resolve(workspace, &cli.surface);
    let cardinal_path = resolve(workspace, &cli.cardinal_output);
    let plots_output = cli
        .plots_output
        .as_deref()
        .map(|p| resolve(workspace, p))
        .unwrap_or_else(|| plots_path.clone());

    let params = TsiParams::new(cli.radius).with_method(parse_method(&cli.method)?);
    let options = WriteOptions {
        overwrite: !cli.no_overwrite,
        pretty: cli.pretty,
    };
    // In-place rewrite of the input plots ignores --no-overwrite
    let plot_options = if plots_output == plots_path {
        WriteOptions {
            overwrite: true,
            ..options.clone()
        }
    } else {
        options.clone()
    };
    check_writable(&cardinal_path, &options)?;
    check_writable(&plots_output, &plot_options)?;

    let mut plots = read_plots(&plots_path)?;
    let surface = read_surface(&surface_path)?;

    let start = Instant::now();
    let run = run_tsi(&mut plots, &surface, &params).context("TSI run failed")?;
    let elapsed = start.elapsed();

    write_layer(&run.cardinals, &cardinal_path, &options)?;
    write_layer(&plots, &plots_output, &plot_options)?;

    println!();
    print!("{}", run.summary);
    println!("  Processing time: {:.2?}", elapsed);

    Ok(())
}
