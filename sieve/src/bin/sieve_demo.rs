//! Filters a synthetic field of blobs and logs what was removed.
//!
//! Usage: `sieve_demo [config.yaml|config.json]`
//!
//! Set `SIEVE_LOG_DIR` to also write rolling log files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sieve::{Config, Grid, MeasureKind, MeasureSet, SegmentFilter, Shape, Thresholds};

const WIDTH: usize = 512;
const HEIGHT: usize = 512;
const BLOBS: usize = 400;

fn main() -> Result<()> {
    let log_dir = std::env::var_os("SIEVE_LOG_DIR").map(PathBuf::from);
    common::log_setup::setup_logging("info", log_dir.as_deref());

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => default_config(),
    };
    tracing::info!(?config, "Using filter config");

    let mut grid = blob_field(Shape::new_2d(WIDTH, HEIGHT), BLOBS, 42);
    let foreground = grid.iter().filter(|&&v| v != 0).count();

    let sieve = SegmentFilter::new(config);
    let report = sieve.apply(&mut grid)?;

    tracing::info!(
        foreground,
        remaining = foreground - report.cleared_cells,
        components = report.components,
        kept = report.kept,
        removed = report.removed,
        "Done"
    );

    Ok(())
}

/// Keep large, elongated regions.
fn default_config() -> Config {
    Config {
        connectivity: Some(8),
        measures: MeasureSet::from(MeasureKind::Surface) | MeasureKind::Eccentricity,
        thresholds: Thresholds::default()
            .with(MeasureKind::Surface, 30)
            .with(MeasureKind::Eccentricity, 60),
        extended_measures: true,
        maximise: true,
        ..Default::default()
    }
}

/// Discs and streaks of random size on an empty background.
fn blob_field(shape: Shape, count: usize, seed: u64) -> Grid<u8> {
    let mut state = seed;
    let mut next = move |bound: usize| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 33) as usize) % bound
    };

    let mut grid = Grid::new_filled(shape, 0u8);
    for _ in 0..count {
        let cx = next(shape.width) as i64;
        let cy = next(shape.height) as i64;
        let rx = 1 + next(8) as i64;
        let ry = if next(4) == 0 { 1 } else { 1 + next(8) as i64 };
        let value = 1 + next(255) as u8;

        for y in (cy - ry).max(0)..=(cy + ry).min(shape.height as i64 - 1) {
            for x in (cx - rx).max(0)..=(cx + rx).min(shape.width as i64 - 1) {
                let dx = (x - cx) as f64 / rx as f64;
                let dy = (y - cy) as f64 / ry as f64;
                if dx * dx + dy * dy <= 1.0 {
                    grid[(x as usize, y as usize, 0)] = value;
                }
            }
        }
    }
    grid
}
