//! Writing the selection back into the grid.

use common::parallel::par_rows_zip_mut;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::grid::{is_foreground, Grid, Pixel};
use crate::labeling::LabelMap;
use crate::select::Survivors;

fn check_shape<T>(grid: &Grid<T>, labels: &LabelMap) -> Result<()> {
    if grid.shape() != labels.shape() {
        return Err(Error::ShapeMismatch {
            expected: grid.shape(),
            actual: labels.shape(),
        });
    }
    Ok(())
}

/// Clear every foreground cell whose label did not survive. Background
/// cells and surviving cells are left untouched.
///
/// Returns the number of cleared cells. Fails with `ShapeMismatch` before
/// writing anything.
pub fn composite<T: Pixel>(
    grid: &mut Grid<T>,
    labels: &LabelMap,
    survivors: &Survivors,
) -> Result<usize> {
    check_shape(grid, labels)?;
    if grid.is_empty() {
        return Ok(0);
    }

    let width = grid.width();
    let cleared = par_rows_zip_mut(grid.pixels_mut(), labels.labels(), width)
        .map(|(_, (cells, cell_labels))| {
            let mut cleared = 0usize;
            for (cell, &label) in cells.iter_mut().zip(cell_labels) {
                if label != 0 && !survivors.contains(label) && is_foreground(*cell) {
                    *cell = T::zero();
                    cleared += 1;
                }
            }
            cleared
        })
        .sum();

    Ok(cleared)
}

/// Like [`composite`], writing into a copy of `grid`.
pub fn composite_to<T: Pixel>(
    grid: &Grid<T>,
    labels: &LabelMap,
    survivors: &Survivors,
) -> Result<Grid<T>> {
    check_shape(grid, labels)?;
    let mut out = grid.clone();
    composite(&mut out, labels, survivors)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use common::Shape;

    use super::*;
    use crate::connectivity::Connectivity;

    #[test]
    fn test_clears_only_rejected_regions() {
        // 7 7 0 3
        // 7 0 0 3
        let mut grid = Grid::new_2d(4, 2, vec![7u8, 7, 0, 3, 7, 0, 0, 3]);
        let labels = LabelMap::from_grid(&grid, Connectivity::Four).unwrap();
        let survivors = Survivors::from_labels(2, [2]);

        let cleared = composite(&mut grid, &labels, &survivors).unwrap();
        assert_eq!(cleared, 3);
        assert_eq!(grid.pixels(), &[0, 0, 0, 3, 0, 0, 0, 3]);
    }

    #[test]
    fn test_keep_all_is_identity() {
        let original = Grid::new(
            Shape::new(3, 2, 2),
            vec![1.5f32, 0.0, 2.0, 0.0, 0.0, 4.0, 1.0, 0.0, 0.0, 0.0, 0.0, 9.0],
        );
        let labels = LabelMap::from_grid(&original, Connectivity::Six).unwrap();
        let mut grid = original.clone();
        let cleared = composite(&mut grid, &labels, &Survivors::all(labels.num_labels())).unwrap();
        assert_eq!(cleared, 0);
        assert_eq!(grid, original);
    }

    #[test]
    fn test_composite_to_leaves_input() {
        let grid = Grid::new_2d(3, 1, vec![5u16, 0, 6]);
        let labels = LabelMap::from_grid(&grid, Connectivity::Four).unwrap();
        let out = composite_to(&grid, &labels, &Survivors::from_labels(2, [1])).unwrap();
        assert_eq!(out.pixels(), &[5, 0, 0]);
        assert_eq!(grid.pixels(), &[5, 0, 6]);
    }

    #[test]
    fn test_shape_mismatch_writes_nothing() {
        let mut grid = Grid::new_2d(3, 2, vec![1u8; 6]);
        let other = Grid::new_2d(2, 3, vec![1u8; 6]);
        let labels = LabelMap::from_grid(&other, Connectivity::Four).unwrap();

        let err = composite(&mut grid, &labels, &Survivors::from_labels(1, [])).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch {
                expected: Shape::new_2d(3, 2),
                actual: Shape::new_2d(2, 3),
            }
        );
        assert!(grid.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_large_grid_parallel_rows() {
        let shape = Shape::new_2d(512, 300);
        let mut grid = Grid::from_fn(shape, |x, y, _| u8::from(x % 4 == 0 || y == 0));
        let labels = LabelMap::from_grid(&grid, Connectivity::Four).unwrap();
        // The comb is a single region; dropping it empties the grid.
        assert_eq!(labels.num_labels(), 1);
        let foreground = grid.iter().filter(|&&v| v != 0).count();
        let cleared = composite(&mut grid, &labels, &Survivors::from_labels(1, [])).unwrap();
        assert_eq!(cleared, foreground);
        assert!(grid.iter().all(|&v| v == 0));
    }
}
