//! The filter pipeline: label, measure, select, composite.
//!
//! [`SegmentFilter`] runs the whole pipeline from a [`Config`]. The free
//! functions [`filter`] and [`filter_codes`] are one-shot calls over typed
//! values and integer codes respectively.

#[cfg(test)]
mod tests;

use common::Shape;

use crate::compose::composite;
use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::grid::{Grid, Pixel};
use crate::labeling::LabelMap;
use crate::measure::{Capabilities, MeasureEngine, MeasureSet, RegionMeasure, RegionRecord};
use crate::select::{select, Survivors, Thresholds};

/// Everything the pipeline learned about a grid, before compositing.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub labels: LabelMap,
    /// One record per region, in label order.
    pub records: Vec<RegionRecord>,
    pub survivors: Survivors,
}

/// Outcome of one filter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterReport {
    /// Connected components found.
    pub components: usize,
    pub kept: usize,
    pub removed: usize,
    /// Foreground cells set to background.
    pub cleared_cells: usize,
}

// =============================================================================
// SegmentFilter
// =============================================================================

/// Removes connected regions whose measures fail the configured thresholds.
///
/// # Example
///
/// ```rust,ignore
/// use sieve::{Config, MeasureKind, SegmentFilter, Thresholds};
///
/// let config = Config {
///     connectivity: Some(8),
///     measures: MeasureKind::Surface.into(),
///     thresholds: Thresholds::default().with(MeasureKind::Surface, 20),
///     ..Default::default()
/// };
/// let report = SegmentFilter::new(config).apply(&mut grid)?;
/// ```
#[derive(Debug)]
pub struct SegmentFilter {
    config: Config,
    engine: MeasureEngine,
}

impl Default for SegmentFilter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SegmentFilter {
    pub fn new(config: Config) -> Self {
        let engine = MeasureEngine::new(config.capabilities()).with_depth_axis(config.depth_axis);
        Self { config, engine }
    }

    /// Replace the default implementation of an extended measure.
    pub fn with_measure(mut self, measure: Box<dyn RegionMeasure>) -> Self {
        self.engine.register(measure);
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn engine(&self) -> &MeasureEngine {
        &self.engine
    }

    /// Check a grid of `shape` can be filtered, returning the connectivity
    /// it will be labeled with.
    pub fn validate(&self, shape: Shape) -> Result<Connectivity> {
        let connectivity = self.config.validate(shape)?;
        self.engine.validate(self.config.measures)?;
        Ok(connectivity)
    }

    /// Label and measure `grid` and decide which regions survive, without
    /// touching it.
    pub fn analyze<T: Pixel>(&self, grid: &Grid<T>) -> Result<Analysis> {
        let connectivity = self.validate(grid.shape())?;
        let measures = self.config.measures;

        let labels = LabelMap::from_grid(grid, connectivity)?;
        if labels.num_labels() == 0 && !measures.is_empty() {
            tracing::warn!(
                shape = %grid.shape(),
                measures = %measures,
                "Grid has no foreground, nothing to filter"
            );
        }

        let records = self.engine.compute(&labels, measures)?;
        let survivors = select(
            &records,
            measures,
            &self.config.thresholds,
            self.config.maximise,
        );

        Ok(Analysis {
            labels,
            records,
            survivors,
        })
    }

    /// Clear every region of `grid` that fails the thresholds.
    ///
    /// On error the grid is left unmodified.
    pub fn apply<T: Pixel>(&self, grid: &mut Grid<T>) -> Result<FilterReport> {
        let analysis = self.analyze(grid)?;
        let cleared_cells = if analysis.survivors.removed() == 0 {
            0
        } else {
            composite(grid, &analysis.labels, &analysis.survivors)?
        };

        let report = FilterReport {
            components: analysis.labels.num_labels(),
            kept: analysis.survivors.len(),
            removed: analysis.survivors.removed(),
            cleared_cells,
        };

        tracing::info!(
            shape = %grid.shape(),
            connectivity = analysis.labels.connectivity().code(),
            measures = %self.config.measures,
            components = report.components,
            kept = report.kept,
            removed = report.removed,
            cleared_cells = report.cleared_cells,
            "Filtered regions"
        );

        Ok(report)
    }
}

// =============================================================================
// One-shot calls
// =============================================================================

/// Filter `grid` in place with base measures only.
///
/// Extended kinds in `measures` fail with `UnsupportedMeasure`; use a
/// [`SegmentFilter`] with `extended_measures` enabled, or [`filter_codes`],
/// to request them.
pub fn filter<T: Pixel>(
    grid: &mut Grid<T>,
    connectivity: Connectivity,
    measures: MeasureSet,
    thresholds: &Thresholds,
    maximise: bool,
) -> Result<FilterReport> {
    let config = Config {
        connectivity: Some(connectivity.code()),
        measures,
        thresholds: *thresholds,
        maximise,
        ..Default::default()
    };
    SegmentFilter::new(config).apply(grid)
}

/// Filter `grid` in place from an integer connectivity code and measure mask.
pub fn filter_codes<T: Pixel>(
    grid: &mut Grid<T>,
    connectivity: u32,
    measure_bits: u32,
    thresholds: &Thresholds,
    maximise: bool,
    capabilities: Capabilities,
) -> Result<FilterReport> {
    let connectivity = Connectivity::from_code(connectivity, grid.shape().ndim())?;
    let config = Config {
        connectivity: Some(connectivity.code()),
        measures: MeasureSet::from_bits(measure_bits)?,
        thresholds: *thresholds,
        maximise,
        extended_measures: capabilities.extended,
        ..Default::default()
    };
    SegmentFilter::new(config).apply(grid)
}
