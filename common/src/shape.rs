//! Dimensions of a dense 2-D or 3-D grid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extent of a grid along x (width), y (height) and z (depth).
///
/// Cells are stored x fastest, then y, then z. A grid with `depth == 1`
/// is two-dimensional. A "row" is the run of `width` cells sharing the same
/// `(y, z)`; rows are numbered `z * height + y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Shape {
    #[inline]
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub const fn new_2d(width: usize, height: usize) -> Self {
        Self::new(width, height, 1)
    }

    /// Total number of cells.
    #[inline]
    pub const fn len(&self) -> usize {
        self.width * self.height * self.depth
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality: 3 when the grid has more than one plane, 2 otherwise.
    #[inline]
    pub const fn ndim(&self) -> usize {
        if self.depth > 1 {
            3
        } else {
            2
        }
    }

    #[inline]
    pub const fn is_3d(&self) -> bool {
        self.depth > 1
    }

    /// Number of cells in one z-plane.
    #[inline]
    pub const fn plane_len(&self) -> usize {
        self.width * self.height
    }

    /// Number of rows over all planes.
    #[inline]
    pub const fn num_rows(&self) -> usize {
        self.height * self.depth
    }

    #[inline]
    pub const fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    /// Inverse of [`Shape::index`].
    #[inline]
    pub const fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let x = idx % self.width;
        let row = idx / self.width;
        (x, row % self.height, row / self.height)
    }

    /// Translate `(x, y, z)` by a signed offset, returning `None` when the
    /// result leaves the grid.
    #[inline]
    pub fn offset(
        &self,
        (x, y, z): (usize, usize, usize),
        (dx, dy, dz): (i32, i32, i32),
    ) -> Option<(usize, usize, usize)> {
        let nx = x.checked_add_signed(dx as isize)?;
        let ny = y.checked_add_signed(dy as isize)?;
        let nz = z.checked_add_signed(dz as isize)?;
        (nx < self.width && ny < self.height && nz < self.depth).then_some((nx, ny, nz))
    }

    /// True when the cell lies on the outer face of the grid.
    ///
    /// The z faces only count for 3-D grids.
    #[inline]
    pub const fn is_border(&self, x: usize, y: usize, z: usize) -> bool {
        x == 0
            || y == 0
            || x + 1 == self.width
            || y + 1 == self.height
            || (self.is_3d() && (z == 0 || z + 1 == self.depth))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_3d() {
            write!(f, "{}x{}x{}", self.width, self.height, self.depth)
        } else {
            write!(f, "{}x{}", self.width, self.height)
        }
    }
}
