use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

use crate::shape::Shape;

/// Dense row-major cell buffer of up to three dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer3<T> {
    pixels: Vec<T>,
    shape: Shape,
}

impl<T> Buffer3<T> {
    pub fn new(shape: Shape, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            shape.len(),
            "pixels length must equal width * height * depth"
        );
        Self { pixels, shape }
    }

    pub fn new_2d(width: usize, height: usize, pixels: Vec<T>) -> Self {
        Self::new(Shape::new_2d(width, height), pixels)
    }

    /// Build a buffer by evaluating `f(x, y, z)` for every cell in storage order.
    pub fn from_fn(shape: Shape, mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut pixels = Vec::with_capacity(shape.len());
        for z in 0..shape.depth {
            for y in 0..shape.height {
                for x in 0..shape.width {
                    pixels.push(f(x, y, z));
                }
            }
        }
        Self { pixels, shape }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> &T {
        debug_assert!(x < self.width() && y < self.height() && z < self.depth());
        &self.pixels[self.shape.index(x, y, z)]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        debug_assert!(x < self.width() && y < self.height() && z < self.depth());
        let idx = self.shape.index(x, y, z);
        &mut self.pixels[idx]
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        self.shape.index(x, y, z)
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.shape.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.shape.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.shape.depth
    }

    /// Cells of row `(y, z)`.
    #[inline]
    pub fn row(&self, y: usize, z: usize) -> &[T] {
        let start = self.shape.index(0, y, z);
        &self.pixels[start..start + self.shape.width]
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.pixels.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.pixels.iter_mut()
    }

    #[inline]
    pub fn copy_from(&mut self, other: &Self)
    where
        T: Copy,
    {
        assert_eq!(self.shape, other.shape, "shape mismatch");
        self.pixels.copy_from_slice(&other.pixels);
    }

    #[inline]
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.pixels.fill(value);
    }
}

impl<T: Default + Clone> Buffer3<T> {
    pub fn new_default(shape: Shape) -> Self {
        Self {
            pixels: vec![T::default(); shape.len()],
            shape,
        }
    }
}

impl<T: Clone> Buffer3<T> {
    pub fn new_filled(shape: Shape, value: T) -> Self {
        Self {
            pixels: vec![value; shape.len()],
            shape,
        }
    }
}

impl<T> Index<(usize, usize, usize)> for Buffer3<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y, z): (usize, usize, usize)) -> &Self::Output {
        &self.pixels[self.shape.index(x, y, z)]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for Buffer3<T> {
    #[inline]
    fn index_mut(&mut self, (x, y, z): (usize, usize, usize)) -> &mut Self::Output {
        let idx = self.shape.index(x, y, z);
        &mut self.pixels[idx]
    }
}

impl<T> Index<usize> for Buffer3<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.pixels[idx]
    }
}

impl<T> IndexMut<usize> for Buffer3<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.pixels[idx]
    }
}

impl<T> Deref for Buffer3<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl<T> DerefMut for Buffer3<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}

impl<'a, T> IntoIterator for &'a Buffer3<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.pixels.iter()
    }
}

impl<T> From<Buffer3<T>> for Vec<T> {
    #[inline]
    fn from(buffer: Buffer3<T>) -> Self {
        buffer.pixels
    }
}
