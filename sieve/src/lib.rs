//! Sieve - connected-component geometric filtering for 2-D and 3-D grids.
//!
//! Foreground cells (any non-zero value) are grouped into connected regions,
//! every region is measured, and regions whose measures fail the configured
//! thresholds are cleared back to background.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sieve::{filter, Connectivity, Grid, MeasureKind, Thresholds};
//!
//! let mut grid = Grid::new_2d(width, height, pixels);
//! let thresholds = Thresholds::default().with(MeasureKind::Surface, 20);
//! let report = filter(
//!     &mut grid,
//!     Connectivity::Eight,
//!     MeasureKind::Surface.into(),
//!     &thresholds,
//!     true,
//! )?;
//! println!("Removed {} of {} regions", report.removed, report.components);
//! ```

pub mod compose;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod filter;
pub mod grid;
pub mod labeling;
pub mod measure;
pub mod select;

// ============================================================================
// Grids and labeling
// ============================================================================

pub use common::Shape;
pub use connectivity::Connectivity;
pub use grid::{foreground_mask, Grid, Pixel};
pub use labeling::LabelMap;

// ============================================================================
// Measures and selection
// ============================================================================

pub use measure::{
    Axis, BaseMeasures, Capabilities, MeasureContext, MeasureEngine, MeasureKind, MeasureSet,
    RegionMeasure, RegionRecord,
};
pub use select::{select, Survivors, Thresholds};

// ============================================================================
// Pipeline
// ============================================================================

pub use compose::{composite, composite_to};
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use filter::{filter, filter_codes, Analysis, FilterReport, SegmentFilter};
