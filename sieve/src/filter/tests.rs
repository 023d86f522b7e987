//! Tests for the filter pipeline.

use common::Shape;

use super::*;
use crate::error::Error;
use crate::measure::{MeasureContext, MeasureKind};

/// Build a 2-D grid from ASCII art rows, `#` is foreground.
fn grid_from_art(rows: &[&str]) -> Grid<u8> {
    let width = rows[0].len();
    let pixels = rows
        .iter()
        .flat_map(|row| row.bytes().map(|b| if b == b'#' { 200 } else { 0 }))
        .collect();
    Grid::new_2d(width, rows.len(), pixels)
}

fn art(grid: &Grid<u8>) -> Vec<String> {
    (0..grid.height())
        .map(|y| {
            grid.row(y, 0)
                .iter()
                .map(|&v| if v == 0 { '.' } else { '#' })
                .collect()
        })
        .collect()
}

fn noise_grid(shape: Shape, density: u64, seed: u64) -> Grid<u16> {
    let mut idx = 0u64;
    Grid::from_fn(shape, |_, _, _| {
        idx += 1;
        let mut x = idx.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ seed;
        x ^= x >> 31;
        x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 27;
        if x % 100 < density {
            (x % 1000) as u16 + 1
        } else {
            0
        }
    })
}

// =============================================================================
// Base measures
// =============================================================================

#[test]
fn test_small_region_removed_when_maximising_surface() {
    // 10-cell region on the left, 2-cell region on the right.
    let mut grid = grid_from_art(&[
        "###..#..", //
        "###..#..", //
        "###.....", //
        "#.......", //
    ]);
    let thresholds = Thresholds::default().with(MeasureKind::Surface, 5);

    let report = filter(
        &mut grid,
        Connectivity::Four,
        MeasureKind::Surface.into(),
        &thresholds,
        true,
    )
    .unwrap();

    assert_eq!(
        report,
        FilterReport {
            components: 2,
            kept: 1,
            removed: 1,
            cleared_cells: 2,
        }
    );
    assert_eq!(
        art(&grid),
        vec!["###.....", "###.....", "###.....", "#......."]
    );
}

#[test]
fn test_minimising_keeps_small_regions() {
    let mut grid = grid_from_art(&[
        "###..#..", //
        "###..#..", //
        "###.....", //
        "#.......", //
    ]);
    let thresholds = Thresholds::default().with(MeasureKind::Surface, 5);

    filter(
        &mut grid,
        Connectivity::Four,
        MeasureKind::Surface.into(),
        &thresholds,
        false,
    )
    .unwrap();

    assert_eq!(
        art(&grid),
        vec![".....#..", ".....#..", "........", "........"]
    );
}

#[test]
fn test_surviving_cells_keep_their_values() {
    let mut grid = Grid::new_2d(5, 1, vec![3u8, 9, 0, 4, 0]);
    let thresholds = Thresholds::default().with(MeasureKind::Volume, 2);

    filter(
        &mut grid,
        Connectivity::Four,
        MeasureKind::Volume.into(),
        &thresholds,
        true,
    )
    .unwrap();

    assert_eq!(grid.pixels(), &[3, 9, 0, 0, 0]);
}

#[test]
fn test_connectivity_decides_what_a_region_is() {
    // Two diagonal pairs: four 1-cell regions under 4-connectivity, one
    // 4-cell region under 8-connectivity.
    let rows = [
        ".....", //
        ".#...", //
        "..#..", //
        "...#.", //
        "....#", //
    ];
    let thresholds = Thresholds::default().with(MeasureKind::Surface, 2);

    let mut grid = grid_from_art(&rows);
    let report = filter(
        &mut grid,
        Connectivity::Four,
        MeasureKind::Surface.into(),
        &thresholds,
        true,
    )
    .unwrap();
    assert_eq!(report.components, 4);
    assert!(grid.iter().all(|&v| v == 0));

    let mut grid = grid_from_art(&rows);
    let report = filter(
        &mut grid,
        Connectivity::Eight,
        MeasureKind::Surface.into(),
        &thresholds,
        true,
    )
    .unwrap();
    assert_eq!(report.components, 1);
    assert_eq!(report.cleared_cells, 0);
    assert_eq!(grid, grid_from_art(&rows));
}

#[test]
fn test_empty_measure_set_keeps_everything() {
    let mut grid = grid_from_art(&[
        "#.#", //
        "...", //
        "#.#", //
    ]);
    let original = grid.clone();
    let thresholds = Thresholds::default().with(MeasureKind::Surface, 100);

    let report = filter(
        &mut grid,
        Connectivity::Four,
        MeasureSet::EMPTY,
        &thresholds,
        true,
    )
    .unwrap();

    assert_eq!(report.components, 4);
    assert_eq!(report.kept, 4);
    assert_eq!(report.removed, 0);
    assert_eq!(grid, original);
}

#[test]
fn test_all_background_grid() {
    let mut grid = Grid::new_2d(6, 4, vec![0u8; 24]);
    let report = filter(
        &mut grid,
        Connectivity::Eight,
        MeasureSet::BASE,
        &Thresholds::default(),
        true,
    )
    .unwrap();
    assert_eq!(report, FilterReport::default());
}

#[test]
fn test_3d_volume_and_depth() {
    // A 3-cell column through every plane and a single cell.
    let shape = Shape::new(4, 4, 3);
    let mut grid = Grid::from_fn(shape, |x, y, z| match (x, y, z) {
        (0, 0, _) => 1.0f32,
        (3, 3, 0) => 2.0,
        _ => 0.0,
    });

    let filter_by = |grid: &mut Grid<f32>, kind: MeasureKind| {
        filter(
            grid,
            Connectivity::Six,
            kind.into(),
            &Thresholds::default().with(kind, 2),
            true,
        )
        .unwrap()
    };

    // Both regions cover one XY position.
    let report = filter_by(&mut grid.clone(), MeasureKind::Surface);
    assert_eq!(report.kept, 0);

    let report = filter_by(&mut grid, MeasureKind::Depth);
    assert_eq!(report.kept, 1);
    assert_eq!(report.cleared_cells, 1);
    assert_eq!(grid[(3, 3, 0)], 0.0);
    assert!((0..3).all(|z| grid[(0, 0, z)] == 1.0));
}

#[test]
fn test_depth_axis_override() {
    // A vertical and a horizontal bar.
    let rows = [
        "#......", //
        "#..####", //
        "#......", //
    ];
    let config = |depth_axis| Config {
        connectivity: Some(4),
        measures: MeasureKind::Depth.into(),
        thresholds: Thresholds::default().with(MeasureKind::Depth, 3),
        depth_axis,
        ..Default::default()
    };

    let mut grid = grid_from_art(&rows);
    SegmentFilter::new(config(None)).apply(&mut grid).unwrap();
    assert_eq!(art(&grid), vec!["#......", "#......", "#......"]);

    let mut grid = grid_from_art(&rows);
    SegmentFilter::new(config(Some(crate::measure::Axis::X)))
        .apply(&mut grid)
        .unwrap();
    assert_eq!(art(&grid), vec![".......", "...####", "......."]);
}

// =============================================================================
// Errors leave the grid untouched
// =============================================================================

#[test]
fn test_invalid_connectivity_on_2d_grid() {
    let mut grid = grid_from_art(&["##.", ".#."]);
    let original = grid.clone();

    let err = filter_codes(
        &mut grid,
        26,
        MeasureKind::Surface.bit().into(),
        &Thresholds::default(),
        true,
        Capabilities::default(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        Error::InvalidConnectivity {
            connectivity: 26,
            ndim: 2
        }
    );
    assert_eq!(grid, original);
}

#[test]
fn test_unknown_connectivity_code() {
    let mut grid = Grid::new(Shape::new(2, 2, 2), vec![1u8; 8]);
    let err = filter_codes(
        &mut grid,
        5,
        0,
        &Thresholds::default(),
        true,
        Capabilities::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::InvalidConnectivity {
            connectivity: 5,
            ndim: 3
        }
    );
}

#[test]
fn test_extended_measure_without_capability() {
    let mut grid = grid_from_art(&["#.#", "#.."]);
    let original = grid.clone();

    let err = filter(
        &mut grid,
        Connectivity::Four,
        MeasureSet::BASE | MeasureKind::Perimeter,
        &Thresholds::default().with(MeasureKind::Surface, 2),
        true,
    )
    .unwrap_err();

    assert_eq!(
        err,
        Error::UnsupportedMeasure {
            kind: MeasureKind::Perimeter
        }
    );
    assert_eq!(grid, original);
}

#[test]
fn test_unknown_measure_bits() {
    let mut grid = grid_from_art(&["#"]);
    let err = filter_codes(
        &mut grid,
        4,
        0x201,
        &Thresholds::default(),
        true,
        Capabilities::EXTENDED,
    )
    .unwrap_err();
    assert_eq!(err, Error::UnknownMeasureBits { bits: 0x201 });
    assert_eq!(grid.pixels(), &[200]);
}

// =============================================================================
// Extended measures
// =============================================================================

#[test]
fn test_hole_count_keeps_ring() {
    let mut grid = grid_from_art(&[
        "#####.....", //
        "#...#.###.", //
        "#####.###.", //
        "......###.", //
    ]);
    let thresholds = Thresholds::default().with(MeasureKind::HoleCount, 1);

    let report = filter_codes(
        &mut grid,
        4,
        MeasureKind::HoleCount.bit().into(),
        &thresholds,
        true,
        Capabilities::EXTENDED,
    )
    .unwrap();

    assert_eq!(report.components, 2);
    assert_eq!(report.cleared_cells, 9);
    assert_eq!(
        art(&grid),
        vec!["#####.....", "#...#.....", "#####.....", ".........."]
    );
}

#[test]
fn test_analyze_does_not_modify_grid() {
    let grid = grid_from_art(&[
        "##..#", //
        "##...", //
    ]);
    let config = Config {
        measures: MeasureSet::ALL,
        extended_measures: true,
        thresholds: Thresholds::default().with(MeasureKind::Volume, 2),
        ..Default::default()
    };

    let analysis = SegmentFilter::new(config).analyze(&grid).unwrap();

    assert_eq!(analysis.labels.num_labels(), 2);
    assert_eq!(analysis.records.len(), 2);
    assert_eq!(analysis.records[0].get(MeasureKind::Volume), Some(4.0));
    assert_eq!(analysis.records[0].get(MeasureKind::Perimeter), Some(8.0));
    assert_eq!(analysis.records[1].get(MeasureKind::Volume), Some(1.0));
    assert_eq!(analysis.survivors.labels().collect::<Vec<_>>(), vec![1]);
    assert_eq!(grid, grid_from_art(&["##..#", "##..."]));
}

/// Scores every region by its own label.
struct LabelScore;

impl RegionMeasure for LabelScore {
    fn kind(&self) -> MeasureKind {
        MeasureKind::Eccentricity
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        (0..=ctx.num_labels()).map(|l| l as f64).collect()
    }
}

#[test]
fn test_custom_measure_replaces_default() {
    let mut grid = grid_from_art(&["#.#.#"]);
    let config = Config {
        measures: MeasureKind::Eccentricity.into(),
        thresholds: Thresholds::default().with(MeasureKind::Eccentricity, 2),
        extended_measures: true,
        ..Default::default()
    };

    let report = SegmentFilter::new(config)
        .with_measure(Box::new(LabelScore))
        .apply(&mut grid)
        .unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(art(&grid), vec!["..#.#"]);
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_repeated_calls_are_identical() {
    // Large enough for the parallel labeling and measure paths.
    let grid = noise_grid(Shape::new_2d(320, 240), 45, 7);
    let config = Config {
        connectivity: Some(8),
        measures: MeasureSet::ALL,
        extended_measures: true,
        thresholds: Thresholds::default()
            .with(MeasureKind::Surface, 3)
            .with(MeasureKind::Eccentricity, 10),
        ..Default::default()
    };
    let sieve = SegmentFilter::new(config);

    let first = sieve.analyze(&grid).unwrap();
    let second = sieve.analyze(&grid).unwrap();
    assert_eq!(first.labels.labels(), second.labels.labels());
    assert_eq!(first.records, second.records);
    assert_eq!(first.survivors, second.survivors);

    let mut a = grid.clone();
    let mut b = grid.clone();
    let report_a = sieve.apply(&mut a).unwrap();
    let report_b = sieve.apply(&mut b).unwrap();
    assert_eq!(report_a, report_b);
    assert_eq!(a, b);
}

#[test]
fn test_cleared_cells_match_removed_volume() {
    let shape = Shape::new(40, 40, 45);
    let mut grid = noise_grid(shape, 30, 11);
    let config = Config {
        connectivity: Some(18),
        measures: MeasureKind::Volume.into(),
        thresholds: Thresholds::default().with(MeasureKind::Volume, 4),
        ..Default::default()
    };
    let sieve = SegmentFilter::new(config);

    let analysis = sieve.analyze(&grid).unwrap();
    let removed_volume: f64 = analysis
        .records
        .iter()
        .filter(|r| !analysis.survivors.contains(r.label))
        .filter_map(|r| r.get(MeasureKind::Volume))
        .sum();

    let report = sieve.apply(&mut grid).unwrap();
    assert_eq!(report.cleared_cells as f64, removed_volume);
    assert_eq!(report.components, report.kept + report.removed);

    // A second pass finds nothing left to remove.
    let again = sieve.apply(&mut grid).unwrap();
    assert_eq!(again.removed, 0);
    assert_eq!(again.components, report.kept);
}
