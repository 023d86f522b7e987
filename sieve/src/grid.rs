use common::{BitBuffer3, Buffer3};
use num_traits::Zero;

/// Cell value of a filterable grid. Zero is background, anything else is
/// foreground.
pub trait Pixel: Copy + Send + Sync + Zero {}

impl<T: Copy + Send + Sync + Zero> Pixel for T {}

pub type Grid<T> = Buffer3<T>;

#[inline]
pub fn is_foreground<T: Pixel>(value: T) -> bool {
    !value.is_zero()
}

/// Bit mask of the grid's foreground cells.
pub fn foreground_mask<T: Pixel>(grid: &Grid<T>) -> BitBuffer3 {
    let pixels = grid.pixels();
    BitBuffer3::from_fn(grid.shape(), |idx| is_foreground(pixels[idx]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Shape;

    #[test]
    fn test_foreground_mask_marks_non_zero_cells() {
        let grid = Grid::new_2d(3, 2, vec![0u8, 5, 0, 1, 0, 255]);
        let mask = foreground_mask(&grid);
        let bits: Vec<bool> = (&mask).into();
        assert_eq!(bits, vec![false, true, false, true, false, true]);
    }

    #[test]
    fn test_float_grid() {
        let grid = Grid::new(Shape::new(2, 1, 2), vec![0.0f32, 0.5, -1.0, 0.0]);
        let mask = foreground_mask(&grid);
        assert_eq!(mask.count_ones(), 2);
        assert!(mask.get_xyz(1, 0, 0));
        assert!(mask.get_xyz(0, 0, 1));
    }
}
