//! Connected component labeling using union-find over foreground runs.
//!
//! - Run-length encoding per row with word-level bit scanning
//! - Rows merged with every earlier row their connectivity reaches
//! - Strip-parallel labeling (whole rows in 2-D, whole planes in 3-D)
//!   with per-strip union-find joined at strip boundaries
//! - Final labels follow seed-visit order on both paths

#[cfg(test)]
mod tests;
mod union_find;

use common::{BitBuffer3, Buffer3, Shape};
use rayon::prelude::*;

use crate::connectivity::{Connectivity, RowLink};
use crate::error::Result;
use crate::grid::{foreground_mask, Grid, Pixel};

use union_find::UnionFind;

/// Cell count below which sequential labeling is faster than parallel.
const PARALLEL_CCL_THRESHOLD: usize = 65_000;

/// Minimum rows per strip in parallel labeling to avoid excessive strip overhead.
const MIN_ROWS_PER_STRIP: usize = 64;

// ============================================================================
// Run-Length Encoding
// ============================================================================

/// A horizontal run of foreground cells within one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Run {
    start: u32, // Starting x coordinate (inclusive)
    end: u32,   // Ending x coordinate (exclusive)
    label: u32, // Provisional label, 0 while unassigned
}

impl Run {
    /// Search window for runs in a linked row, end exclusive.
    #[inline]
    fn search_window(&self, reach: u32) -> (u32, u32) {
        (self.start.saturating_sub(reach), self.end + reach)
    }
}

/// Check if two runs from linked rows are connected.
#[inline]
fn runs_connected(prev: &Run, curr: &Run, reach: u32) -> bool {
    prev.start < curr.end + reach && prev.end + reach > curr.start
}

/// Extract runs from one row of the mask using word-level bit scanning.
#[inline]
pub(crate) fn extract_runs_from_row(row_words: &[u64], width: usize, runs: &mut Vec<Run>) {
    let mut in_run = false;
    let mut run_start = 0u32;

    for (word_idx, &word) in row_words.iter().enumerate() {
        let base_x = (word_idx * 64) as u32;

        if word == 0 {
            if in_run {
                runs.push(Run {
                    start: run_start,
                    end: base_x.min(width as u32),
                    label: 0,
                });
                in_run = false;
            }
            continue;
        }

        if word == !0u64 {
            if !in_run {
                run_start = base_x;
                in_run = true;
            }
            continue;
        }

        extract_runs_from_mixed_word(
            word,
            base_x,
            width as u32,
            &mut in_run,
            &mut run_start,
            runs,
        );
    }

    if in_run {
        runs.push(Run {
            start: run_start,
            end: width as u32,
            label: 0,
        });
    }
}

/// Extract run transitions from a word holding both 0s and 1s using CTZ.
#[inline]
fn extract_runs_from_mixed_word(
    word: u64,
    base_x: u32,
    width: u32,
    in_run: &mut bool,
    run_start: &mut u32,
    runs: &mut Vec<Run>,
) {
    let word_end = (base_x + 64).min(width);
    let mut pos = base_x;

    while pos < word_end {
        let bit_offset = pos - base_x;
        let remaining_bits = word >> bit_offset;

        if *in_run {
            // Next 0 bit ends the run
            if remaining_bits == !0u64 >> bit_offset {
                break;
            }
            let end_pos = pos + (!remaining_bits).trailing_zeros();
            if end_pos >= word_end {
                break;
            }
            runs.push(Run {
                start: *run_start,
                end: end_pos,
                label: 0,
            });
            *in_run = false;
            pos = end_pos;
        } else {
            // Next 1 bit starts a run
            if remaining_bits == 0 {
                break;
            }
            let start_pos = pos + remaining_bits.trailing_zeros();
            if start_pos >= word_end {
                break;
            }
            *run_start = start_pos;
            *in_run = true;
            pos = start_pos;
        }
    }
}

// ============================================================================
// LabelMap
// ============================================================================

/// Per-cell component labels: 0 for background, `1..=num_labels` otherwise.
///
/// Labels are numbered in the order each component's first cell appears
/// in storage order (x fastest, then y, then z).
#[derive(Debug, Clone)]
pub struct LabelMap {
    labels: Buffer3<u32>,
    num_labels: usize,
    connectivity: Connectivity,
}

impl LabelMap {
    /// Label the foreground of `grid`.
    ///
    /// Fails with `InvalidConnectivity` before touching the grid when the
    /// connectivity does not fit its dimensionality.
    pub fn from_grid<T: Pixel>(grid: &Grid<T>, connectivity: Connectivity) -> Result<Self> {
        connectivity.validate(grid.shape().ndim())?;
        let mask = foreground_mask(grid);
        Ok(Self::from_mask(&mask, connectivity))
    }

    /// Label the set bits of `mask`.
    ///
    /// Uses strip-parallel labeling for large masks:
    /// 1. Split rows (2-D) or planes (3-D) into strips
    /// 2. Label each strip in parallel with its own union-find
    /// 3. Join the strips' union-finds and merge runs across strip boundaries
    /// 4. Flatten and write final labels per strip in parallel
    pub fn from_mask(mask: &BitBuffer3, connectivity: Connectivity) -> Self {
        let shape = mask.shape();
        assert_eq!(
            connectivity.ndim(),
            shape.ndim(),
            "{connectivity} connectivity does not fit a {shape} mask"
        );

        let (labels, num_labels) = if shape.len() < PARALLEL_CCL_THRESHOLD {
            label_mask_sequential(mask, connectivity)
        } else {
            label_mask_parallel(mask, connectivity)
        };

        tracing::debug!(
            shape = %shape,
            connectivity = connectivity.code(),
            num_labels,
            "Labeled connected components"
        );

        Self {
            labels,
            num_labels,
            connectivity,
        }
    }

    /// Number of connected components (excluding background).
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.labels.shape()
    }

    /// Raw labels in storage order.
    #[inline]
    pub fn labels(&self) -> &[u32] {
        self.labels.pixels()
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer3<u32> {
        &self.labels
    }

    #[inline]
    pub fn label_at(&self, x: usize, y: usize, z: usize) -> u32 {
        *self.labels.get(x, y, z)
    }

    /// Number of labeled (foreground) cells.
    pub fn cell_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l != 0).count()
    }

    /// Cell count per label, indexed by label (index 0 unused).
    pub fn component_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.num_labels + 1];
        for &l in self.labels.iter() {
            sizes[l as usize] += 1;
        }
        sizes[0] = 0;
        sizes
    }
}

impl std::ops::Index<usize> for LabelMap {
    type Output = u32;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.labels[idx]
    }
}

// ============================================================================
// Run merging
// ============================================================================

/// Merge `curr_runs` with the runs of one linked earlier row.
///
/// An unlabeled run adopts the first connected label; further connected
/// labels are unioned with it. Runs left unlabeled are handled by the caller
/// once every link has been visited.
#[inline]
fn merge_runs_with_prev(
    curr_runs: &mut [Run],
    prev_runs: &[Run],
    reach: u32,
    uf: &mut UnionFind,
) {
    let mut prev_idx = 0;
    for run in curr_runs.iter_mut() {
        let (search_start, search_end) = run.search_window(reach);

        while prev_idx < prev_runs.len() && prev_runs[prev_idx].end <= search_start {
            prev_idx += 1;
        }

        let mut check_idx = prev_idx;
        while check_idx < prev_runs.len() && prev_runs[check_idx].start < search_end {
            let prev_run = &prev_runs[check_idx];
            if runs_connected(prev_run, run, reach) {
                match run.label {
                    0 => run.label = prev_run.label,
                    label if label != prev_run.label => uf.union(label, prev_run.label),
                    _ => {}
                }
            }
            check_idx += 1;
        }
    }
}

/// Row number of `row` shifted by a link, if it stays inside the grid.
#[inline]
fn linked_row(shape: Shape, row: usize, link: &RowLink) -> Option<usize> {
    let y = (row % shape.height).checked_add_signed(link.dy as isize)?;
    let z = (row / shape.height).checked_add_signed(link.dz as isize)?;
    (y < shape.height && z < shape.depth).then_some(z * shape.height + y)
}

// ============================================================================
// Strip labeling
// ============================================================================

/// Runs and provisional labels of a contiguous range of rows.
#[derive(Debug)]
struct StripResult {
    row_start: usize,
    row_end: usize,
    /// Runs of all rows, row after row
    runs: Vec<Run>,
    /// `runs[row_bounds[i]..row_bounds[i + 1]]` belong to row `row_start + i`
    row_bounds: Vec<usize>,
    uf: UnionFind,
}

impl StripResult {
    #[inline]
    fn row_runs(&self, row: usize) -> &[Run] {
        let i = row - self.row_start;
        &self.runs[self.row_bounds[i]..self.row_bounds[i + 1]]
    }
}

/// Label rows `row_start..row_end` with a strip-local union-find.
fn label_strip(
    mask: &BitBuffer3,
    links: &[RowLink],
    row_start: usize,
    row_end: usize,
) -> StripResult {
    let shape = mask.shape();
    let width = shape.width;

    let mut runs: Vec<Run> = Vec::with_capacity(((row_end - row_start) * width) / 64);
    let mut row_bounds = Vec::with_capacity(row_end - row_start + 1);
    row_bounds.push(0);
    let mut uf = UnionFind::new();
    let mut curr_runs: Vec<Run> = Vec::with_capacity(width / 4);

    for row in row_start..row_end {
        curr_runs.clear();
        extract_runs_from_row(mask.row_words(row), width, &mut curr_runs);

        if !curr_runs.is_empty() {
            for link in links {
                let Some(prev_row) = linked_row(shape, row, link) else {
                    continue;
                };
                if prev_row < row_start {
                    continue;
                }
                let i = prev_row - row_start;
                let prev_runs = &runs[row_bounds[i]..row_bounds[i + 1]];
                merge_runs_with_prev(&mut curr_runs, prev_runs, link.reach, &mut uf);
            }

            for run in curr_runs.iter_mut().filter(|run| run.label == 0) {
                run.label = uf.make_set();
            }
            runs.extend_from_slice(&curr_runs);
        }

        row_bounds.push(runs.len());
    }

    StripResult {
        row_start,
        row_end,
        runs,
        row_bounds,
        uf,
    }
}

/// Union runs of `below`'s leading rows with their linked rows in `above`.
///
/// Labels are shifted by each strip's offset into the joined union-find.
fn merge_strip_boundary(
    shape: Shape,
    links: &[RowLink],
    above: (&StripResult, u32),
    below: (&StripResult, u32),
    uf: &mut UnionFind,
) {
    let (above, above_offset) = above;
    let (below, below_offset) = below;

    let mut curr_runs: Vec<Run> = Vec::new();
    let mut prev_runs: Vec<Run> = Vec::new();

    for row in below.row_start..below.row_end {
        let mut crosses = false;
        for link in links {
            let Some(prev_row) = linked_row(shape, row, link) else {
                continue;
            };
            if prev_row >= below.row_start {
                continue;
            }
            crosses = true;
            debug_assert!(prev_row >= above.row_start);

            curr_runs.clear();
            curr_runs.extend(below.row_runs(row).iter().map(|run| Run {
                label: run.label + below_offset,
                ..*run
            }));
            prev_runs.clear();
            prev_runs.extend(above.row_runs(prev_row).iter().map(|run| Run {
                label: run.label + above_offset,
                ..*run
            }));
            merge_runs_with_prev(&mut curr_runs, &prev_runs, link.reach, uf);
        }

        // Only the leading row (2-D) or plane (3-D) links across.
        if !crosses {
            break;
        }
    }
}

/// Row ranges of `num_strips` strips made of whole units of `unit_rows` rows.
fn strip_bounds(shape: Shape, num_strips: usize) -> Vec<(usize, usize)> {
    let unit_rows = if shape.is_3d() { shape.height } else { 1 };
    let num_rows = shape.num_rows();
    let units = num_rows / unit_rows.max(1);
    let num_strips = num_strips.clamp(1, units.max(1));
    let units_per_strip = units / num_strips;

    (0..num_strips)
        .map(|strip_idx| {
            let start = strip_idx * units_per_strip * unit_rows;
            let end = if strip_idx == num_strips - 1 {
                num_rows
            } else {
                (strip_idx + 1) * units_per_strip * unit_rows
            };
            (start, end)
        })
        .collect()
}

/// Label `mask` split into `num_strips` strips. The result does not depend
/// on the number of strips.
pub(crate) fn label_mask_strips(
    mask: &BitBuffer3,
    connectivity: Connectivity,
    num_strips: usize,
) -> (Buffer3<u32>, usize) {
    let shape = mask.shape();
    let mut labels = Buffer3::new_default(shape);
    if shape.is_empty() {
        return (labels, 0);
    }

    let links = connectivity.row_links();
    let bounds = strip_bounds(shape, num_strips);

    // Phase 1: label each strip
    let strips: Vec<StripResult> = if bounds.len() == 1 {
        vec![label_strip(mask, &links, 0, shape.num_rows())]
    } else {
        bounds
            .par_iter()
            .map(|&(start, end)| label_strip(mask, &links, start, end))
            .collect()
    };

    // Phase 2: join strip union-finds in scan order
    let total: usize = strips.iter().map(|s| s.uf.len()).sum();
    let mut uf = UnionFind::with_capacity(total);
    let offsets: Vec<u32> = strips.iter().map(|s| uf.append(&s.uf)).collect();

    // Phase 3: merge labels across strip boundaries
    for strip_idx in 1..strips.len() {
        merge_strip_boundary(
            shape,
            &links,
            (&strips[strip_idx - 1], offsets[strip_idx - 1]),
            (&strips[strip_idx], offsets[strip_idx]),
            &mut uf,
        );
    }

    if uf.is_empty() {
        return (labels, 0);
    }

    // Phase 4: flatten to seed-visit order and write final labels
    let (label_map, num_labels) = uf.flatten();
    let width = shape.width;

    let write_strip = |(chunk, (strip, &offset)): (&mut [u32], (&StripResult, &u32))| {
        for row in strip.row_start..strip.row_end {
            let row_base = (row - strip.row_start) * width;
            for run in strip.row_runs(row) {
                let label = label_map[(run.label + offset) as usize];
                chunk[row_base + run.start as usize..row_base + run.end as usize].fill(label);
            }
        }
    };

    let mut chunks: Vec<&mut [u32]> = Vec::with_capacity(strips.len());
    let mut rest = labels.pixels_mut();
    for strip in &strips {
        let (head, tail) =
            std::mem::take(&mut rest).split_at_mut((strip.row_end - strip.row_start) * width);
        chunks.push(head);
        rest = tail;
    }

    if strips.len() == 1 {
        chunks
            .into_iter()
            .zip(strips.iter().zip(offsets.iter()))
            .for_each(write_strip);
    } else {
        chunks
            .into_par_iter()
            .zip(strips.par_iter().zip(offsets.par_iter()))
            .for_each(write_strip);
    }

    (labels, num_labels)
}

/// Sequential labeling for small masks.
pub(crate) fn label_mask_sequential(
    mask: &BitBuffer3,
    connectivity: Connectivity,
) -> (Buffer3<u32>, usize) {
    label_mask_strips(mask, connectivity, 1)
}

/// Strip-parallel labeling for large masks.
pub(crate) fn label_mask_parallel(
    mask: &BitBuffer3,
    connectivity: Connectivity,
) -> (Buffer3<u32>, usize) {
    let shape = mask.shape();
    let num_threads = rayon::current_num_threads();
    let num_strips = if shape.is_3d() {
        let planes_per_strip = MIN_ROWS_PER_STRIP.div_ceil(shape.height.max(1));
        shape.depth / planes_per_strip
    } else {
        shape.height / MIN_ROWS_PER_STRIP
    };
    label_mask_strips(mask, connectivity, num_strips.clamp(1, num_threads))
}
