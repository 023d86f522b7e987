//! Filter configuration.
//!
//! A flat [`Config`] that can be built in code or loaded from a YAML or JSON
//! file. Every field has a default, so a file only needs to name what it
//! changes:
//!
//! ```yaml
//! connectivity: 8
//! measures: [surface, hole-count]
//! thresholds:
//!   surface: 20
//!   hole-count: 1
//! maximise: true
//! extended-measures: true
//! ```

use std::path::Path;

use common::{FileExtensionError, FileFormat, SerdeFormatError, Shape};
use serde::{Deserialize, Serialize};

use crate::connectivity::Connectivity;
use crate::error::Result;
use crate::measure::{Axis, Capabilities, MeasureSet};
use crate::select::Thresholds;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Extension(#[from] FileExtensionError),
    #[error("Failed to parse config")]
    Format(#[from] SerdeFormatError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    // -- Labeling --
    /// Integer connectivity code (4, 8, 6, 18 or 26). `None` uses face
    /// connectivity for the grid's dimensionality.
    pub connectivity: Option<u32>,

    // -- Measures --
    /// Measures every region is tested against.
    pub measures: MeasureSet,
    /// Axis the depth measure is taken along. `None` uses z for 3-D grids
    /// and y for 2-D grids.
    pub depth_axis: Option<Axis>,
    /// Allow extended measures (perimeter and beyond).
    pub extended_measures: bool,

    // -- Selection --
    pub thresholds: Thresholds,
    /// Keep regions at or above the thresholds instead of at or below.
    pub maximise: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connectivity: None,
            measures: MeasureSet::EMPTY,
            depth_axis: None,
            extended_measures: false,
            thresholds: Thresholds::default(),
            maximise: true,
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let config = Self::deserialize(&text, format)?;
        tracing::debug!(path = %path.display(), "Loaded filter config");
        Ok(config)
    }

    pub fn deserialize(
        serialized: &str,
        format: FileFormat,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(common::deserialize(serialized, format)?)
    }

    pub fn serialize(&self, format: FileFormat) -> std::result::Result<String, ConfigError> {
        Ok(common::serialize(self, format)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::result::Result<(), ConfigError> {
        let path = path.as_ref();
        let text = self.serialize(FileFormat::from_path(path)?)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            extended: self.extended_measures,
        }
    }

    /// Resolve the connectivity for a grid of `shape`.
    pub fn connectivity_for(&self, shape: Shape) -> Result<Connectivity> {
        match self.connectivity {
            Some(code) => Connectivity::from_code(code, shape.ndim()),
            None => Ok(Connectivity::face(shape.ndim())),
        }
    }

    /// Run every check a filter call makes before touching a grid of
    /// `shape`, returning the resolved connectivity.
    pub fn validate(&self, shape: Shape) -> Result<Connectivity> {
        let connectivity = self.connectivity_for(shape)?;
        self.capabilities().check(self.measures)?;
        Ok(connectivity)
    }
}
