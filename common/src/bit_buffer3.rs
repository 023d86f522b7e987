//! Bit-packed, row-aligned boolean mask over a [`Shape`].
//!
//! Every row starts on a word boundary so that run extraction can scan one
//! row's words without masking neighbours. Padding bits past `width` are
//! always zero.

use rayon::prelude::*;

use crate::shape::Shape;

/// Number of bits per storage word.
const BITS_PER_WORD: usize = 64;

/// Rows below which building a mask in parallel is not worth it.
const PARALLEL_ROWS_THRESHOLD: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer3 {
    /// Packed bit storage, LSB first, `words_per_row` words per row.
    words: Vec<u64>,
    shape: Shape,
    words_per_row: usize,
}

impl BitBuffer3 {
    /// Create a new bit buffer filled with the given value.
    pub fn new_filled(shape: Shape, value: bool) -> Self {
        let words_per_row = shape.width.div_ceil(BITS_PER_WORD);
        let mut buf = Self {
            words: vec![0u64; words_per_row * shape.num_rows()],
            shape,
            words_per_row,
        };
        if value {
            buf.fill(true);
        }
        buf
    }

    #[inline]
    pub fn new_default(shape: Shape) -> Self {
        Self::new_filled(shape, false)
    }

    /// Create a bit buffer from a slice of booleans in storage order.
    pub fn from_slice(shape: Shape, data: &[bool]) -> Self {
        assert_eq!(
            data.len(),
            shape.len(),
            "data length {} does not match shape {}",
            data.len(),
            shape
        );
        Self::from_fn(shape, |idx| data[idx])
    }

    /// Build a mask by evaluating `f(linear_index)` for every cell.
    ///
    /// Rows are filled in parallel for large shapes.
    pub fn from_fn<F>(shape: Shape, f: F) -> Self
    where
        F: Fn(usize) -> bool + Sync,
    {
        let mut buf = Self::new_default(shape);
        if shape.is_empty() {
            return buf;
        }

        let width = shape.width;
        let words_per_row = buf.words_per_row;
        let fill_row = |(row, words): (usize, &mut [u64])| {
            let base = row * width;
            for x in 0..width {
                if f(base + x) {
                    words[x / BITS_PER_WORD] |= 1u64 << (x % BITS_PER_WORD);
                }
            }
        };

        if shape.num_rows() >= PARALLEL_ROWS_THRESHOLD {
            buf.words
                .par_chunks_mut(words_per_row)
                .enumerate()
                .for_each(fill_row);
        } else {
            buf.words
                .chunks_mut(words_per_row)
                .enumerate()
                .for_each(fill_row);
        }
        buf
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
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

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    #[inline]
    fn locate(&self, idx: usize) -> (usize, u32) {
        debug_assert!(idx < self.len());
        let row = idx / self.shape.width;
        let x = idx % self.shape.width;
        (
            row * self.words_per_row + x / BITS_PER_WORD,
            (x % BITS_PER_WORD) as u32,
        )
    }

    /// Get a bit value at the given linear index.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        let (word, bit) = self.locate(idx);
        (self.words[word] >> bit) & 1 != 0
    }

    /// Set a bit value at the given linear index.
    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        let (word, bit) = self.locate(idx);
        if value {
            self.words[word] |= 1u64 << bit;
        } else {
            self.words[word] &= !(1u64 << bit);
        }
    }

    #[inline]
    pub fn get_xyz(&self, x: usize, y: usize, z: usize) -> bool {
        self.get(self.shape.index(x, y, z))
    }

    #[inline]
    pub fn set_xyz(&mut self, x: usize, y: usize, z: usize, value: bool) {
        let idx = self.shape.index(x, y, z);
        self.set(idx, value);
    }

    /// Fill all cells with the given value, keeping padding bits clear.
    pub fn fill(&mut self, value: bool) {
        if !value {
            self.words.fill(0);
            return;
        }
        let width = self.shape.width;
        let tail_bits = width % BITS_PER_WORD;
        for row in self.words.chunks_mut(self.words_per_row.max(1)) {
            row.fill(!0u64);
            if tail_bits != 0 {
                if let Some(last) = row.last_mut() {
                    *last = (1u64 << tail_bits) - 1;
                }
            }
        }
    }

    /// Underlying word storage, `words_per_row()` words per row.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    /// Words of row number `row` (`z * height + y`).
    #[inline]
    pub fn row_words(&self, row: usize) -> &[u64] {
        let start = row * self.words_per_row;
        &self.words[start..start + self.words_per_row]
    }

    /// Count the number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Return a mask with every cell flipped.
    pub fn inverted(&self) -> Self {
        let mut out = self.clone();
        for w in out.words.iter_mut() {
            *w = !*w;
        }
        let tail_bits = self.shape.width % BITS_PER_WORD;
        if tail_bits != 0 {
            let keep = (1u64 << tail_bits) - 1;
            for row in out.words.chunks_mut(self.words_per_row) {
                if let Some(last) = row.last_mut() {
                    *last &= keep;
                }
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |idx| self.get(idx))
    }
}

impl From<&BitBuffer3> for Vec<bool> {
    #[inline]
    fn from(buf: &BitBuffer3) -> Self {
        buf.iter().collect()
    }
}
