use common::Shape;

use crate::measure::MeasureKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Connectivity {connectivity} is not valid for a {ndim}-D grid")]
    InvalidConnectivity { connectivity: u32, ndim: usize },
    #[error("Shape mismatch: grid is {expected}, label map is {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },
    #[error("Measure '{kind}' requires extended measures, which are disabled")]
    UnsupportedMeasure { kind: MeasureKind },
    #[error("Measure mask {bits:#x} contains bits that name no measure")]
    UnknownMeasureBits { bits: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
