//! Neighbourhood models for 2-D and 3-D grids.

use arrayvec::ArrayVec;
use glam::IVec3;
use strum_macros::{Display, EnumIter};

use crate::error::{Error, Result};

/// Which neighbours count as touching when grouping cells into regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Connectivity {
    /// 2-D, edge neighbours only: (x±1, y) and (x, y±1).
    Four,
    /// 2-D, edge and corner neighbours.
    Eight,
    /// 3-D, face neighbours only.
    Six,
    /// 3-D, face and edge neighbours.
    Eighteen,
    /// 3-D, the full 3x3x3 neighbourhood.
    TwentySix,
}

/// A previously scanned row that the runs of the current row may touch.
///
/// `reach` is how far a run may be offset along x and still connect:
/// 0 means the x-ranges must overlap, 1 means touching diagonally is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLink {
    pub dy: i32,
    pub dz: i32,
    pub reach: u32,
}

impl Connectivity {
    /// Resolve an integer code (4, 8, 6, 18 or 26) for a grid of `ndim`
    /// dimensions.
    pub fn from_code(code: u32, ndim: usize) -> Result<Self> {
        let connectivity = match code {
            4 => Self::Four,
            8 => Self::Eight,
            6 => Self::Six,
            18 => Self::Eighteen,
            26 => Self::TwentySix,
            _ => {
                return Err(Error::InvalidConnectivity {
                    connectivity: code,
                    ndim,
                })
            }
        };
        connectivity.validate(ndim)?;
        Ok(connectivity)
    }

    /// Face connectivity for the given dimensionality.
    pub const fn face(ndim: usize) -> Self {
        if ndim >= 3 {
            Self::Six
        } else {
            Self::Four
        }
    }

    #[inline]
    pub const fn code(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
            Self::Six => 6,
            Self::Eighteen => 18,
            Self::TwentySix => 26,
        }
    }

    #[inline]
    pub const fn ndim(self) -> usize {
        match self {
            Self::Four | Self::Eight => 2,
            Self::Six | Self::Eighteen | Self::TwentySix => 3,
        }
    }

    pub fn validate(self, ndim: usize) -> Result<()> {
        if self.ndim() == ndim {
            Ok(())
        } else {
            Err(Error::InvalidConnectivity {
                connectivity: self.code(),
                ndim,
            })
        }
    }

    /// Largest L1 distance between two connected cells.
    #[inline]
    const fn max_l1(self) -> i32 {
        match self {
            Self::Four | Self::Six => 1,
            Self::Eight | Self::Eighteen => 2,
            Self::TwentySix => 3,
        }
    }

    /// Neighbour offsets, ordered by (dz, dy, dx).
    pub fn offsets(self) -> ArrayVec<IVec3, 26> {
        let z_range = if self.ndim() == 3 { -1..=1 } else { 0..=0 };
        let max_l1 = self.max_l1();
        let mut offsets = ArrayVec::new();
        for dz in z_range {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let offset = IVec3::new(dx, dy, dz);
                    let l1 = offset.abs().element_sum();
                    if l1 != 0 && l1 <= max_l1 {
                        offsets.push(offset);
                    }
                }
            }
        }
        offsets
    }

    /// Connectivity used for the background when the foreground uses `self`.
    pub const fn complement(self) -> Self {
        match self {
            Self::Four => Self::Eight,
            Self::Eight => Self::Four,
            Self::Six => Self::TwentySix,
            Self::Eighteen | Self::TwentySix => Self::Six,
        }
    }

    /// Earlier rows in scan order that a row connects to.
    pub fn row_links(self) -> ArrayVec<RowLink, 4> {
        let max_l1 = self.max_l1();
        let mut links = ArrayVec::new();
        for offset in self.offsets() {
            let earlier = offset.z < 0 || (offset.z == 0 && offset.y < 0);
            if !earlier || offset.x != 0 {
                continue;
            }
            let spent = offset.y.abs() + offset.z.abs();
            links.push(RowLink {
                dy: offset.y,
                dz: offset.z,
                reach: u32::from(max_l1 - spent >= 1),
            });
        }
        links
    }
}
