use anyhow::{Context, Result};
use clap::Parser;

use nvgrid::cli::{Cli, Commands};
use nvgrid::{GridRenderer, RecordingHost};
use nvgrid_config::Config;
use nvgrid_fonts::{FontManager, FontRequest};
use nvgrid_render::{CellMetrics, HeadlessBackend};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };

    // CLI --log-level wins over DEBUG_LEVEL, which wins over the config.
    let env_level = std::env::var("DEBUG_LEVEL").ok();
    nvgrid::debug::init_log_bridge(nvgrid::debug::resolve_level(
        cli.log_level,
        env_level.as_deref(),
        config.log_level,
    ));
    log::info!("Starting nvgrid {}", nvgrid::VERSION);

    let result = match cli.command {
        Commands::Replay {
            file,
            width,
            height,
            lenient,
        } => run_replay(&config, &file, width, height, lenient),
    };
    if let Err(ref e) = result {
        log::error!("{e:#}");
        eprintln!("nvgrid: error: {e:#}");
    }
    result
}

fn run_replay(
    config: &Config,
    file: &std::path::Path,
    width: Option<u32>,
    height: Option<u32>,
    lenient: bool,
) -> Result<()> {
    let batches = nvgrid::replay::load_batches(file)?;

    let metrics = headless_metrics(config);
    let mut renderer =
        GridRenderer::from_config(HeadlessBackend::new(metrics), RecordingHost::default(), config)
            .context("failed to create renderer")?;
    if lenient {
        renderer.set_strict(false);
    }

    let fit = renderer.grid_to_pixel_size(config.rows, config.cols);
    renderer
        .resize_surface(width.unwrap_or(fit.width), height.unwrap_or(fit.height))
        .context("failed to attach surface")?;

    let stats = nvgrid::replay::replay(&mut renderer, &batches)?;

    let grid = renderer.grid();
    for row in 0..grid.rows() {
        println!("{}", grid.row_text(row).unwrap_or_default().trim_end());
    }
    println!("---");
    println!(
        "title: {}",
        renderer.host().title.as_deref().unwrap_or(&config.title_suffix)
    );
    println!(
        "grid {}x{}, cursor {},{}, cell {}x{} px",
        grid.cols(),
        grid.rows(),
        renderer.cursor().row(),
        renderer.cursor().col(),
        renderer.metrics().cell_width,
        renderer.metrics().cell_height
    );
    println!(
        "{} batches, {} events, {} presents, {} recoveries, {} skipped",
        stats.batches, stats.events, stats.presents, stats.recoveries, stats.violations
    );
    Ok(())
}

/// Cell size of the configured font when it can be resolved, otherwise a
/// size estimated from the point size.
fn headless_metrics(config: &Config) -> CellMetrics {
    let request = FontRequest::from_config(config);
    let computed = FontManager::new(&request.family).and_then(|fonts| fonts.metrics(&request));
    match computed {
        Ok(metrics) => CellMetrics::from_font(&metrics, request.dpi_scale),
        Err(e) => {
            log::warn!("font '{}' unavailable ({e}), estimating cell size", request.family);
            let px = request.clamped_point_size() * request.dpi_scale * 96.0 / 72.0;
            CellMetrics::new(px * 0.6, px * 1.2 * request.linespace_factor)
        }
    }
}
