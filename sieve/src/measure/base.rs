//! Surface, depth and volume in one traversal.

use std::ops::Range;

use common::parallel::rows_per_chunk;
use rayon::prelude::*;

use super::Axis;
use crate::labeling::LabelMap;

/// Cell count below which the base pass runs on one thread.
const PARALLEL_MEASURE_THRESHOLD: usize = 65_000;

/// Base measures of every region, indexed by label (index 0 unused).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMeasures {
    /// Distinct (x, y) positions covered.
    pub surface: Vec<u64>,
    /// `max - min + 1` of the coordinate along the depth axis.
    pub depth: Vec<u64>,
    pub volume: Vec<u64>,
    /// Linear index of the region's first cell in storage order.
    pub seeds: Vec<usize>,
}

/// Accumulators of one band of y values.
#[derive(Debug)]
struct Partial {
    surface: Vec<u64>,
    volume: Vec<u64>,
    axis_min: Vec<usize>,
    axis_max: Vec<usize>,
    seeds: Vec<usize>,
}

impl Partial {
    fn new(len: usize) -> Self {
        Self {
            surface: vec![0; len],
            volume: vec![0; len],
            axis_min: vec![usize::MAX; len],
            axis_max: vec![0; len],
            seeds: vec![usize::MAX; len],
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.surface.iter_mut().zip(&other.surface) {
            *a += b;
        }
        for (a, b) in self.volume.iter_mut().zip(&other.volume) {
            *a += b;
        }
        for (a, &b) in self.axis_min.iter_mut().zip(&other.axis_min) {
            *a = (*a).min(b);
        }
        for (a, &b) in self.axis_max.iter_mut().zip(&other.axis_max) {
            *a = (*a).max(b);
        }
        for (a, &b) in self.seeds.iter_mut().zip(&other.seeds) {
            *a = (*a).min(b);
        }
        self
    }
}

/// Walk every (x, y) column of `ys`, z innermost.
fn accumulate(labels: &LabelMap, depth_axis: Axis, ys: Range<usize>) -> Partial {
    let shape = labels.shape();
    let cells = labels.labels();
    let len = labels.num_labels() + 1;
    let mut partial = Partial::new(len);
    // Last column each label was counted in, for the XY footprint.
    let mut stamp = vec![usize::MAX; len];

    for y in ys {
        for x in 0..shape.width {
            let column = y * shape.width + x;
            for z in 0..shape.depth {
                let idx = shape.index(x, y, z);
                let l = cells[idx] as usize;
                if l == 0 {
                    continue;
                }
                partial.volume[l] += 1;
                if stamp[l] != column {
                    stamp[l] = column;
                    partial.surface[l] += 1;
                }
                let coord = depth_axis.pick((x, y, z));
                partial.axis_min[l] = partial.axis_min[l].min(coord);
                partial.axis_max[l] = partial.axis_max[l].max(coord);
                partial.seeds[l] = partial.seeds[l].min(idx);
            }
        }
    }

    partial
}

impl BaseMeasures {
    pub fn compute(labels: &LabelMap, depth_axis: Axis) -> Self {
        let shape = labels.shape();
        let len = labels.num_labels() + 1;
        let height = shape.height;

        let partial = if shape.len() < PARALLEL_MEASURE_THRESHOLD || height < 2 {
            accumulate(labels, depth_axis, 0..height)
        } else {
            let band = rows_per_chunk(height);
            (0..height.div_ceil(band))
                .into_par_iter()
                .map(|i| accumulate(labels, depth_axis, i * band..((i + 1) * band).min(height)))
                .reduce(|| Partial::new(len), Partial::merge)
        };

        let depth = partial
            .axis_min
            .iter()
            .zip(&partial.axis_max)
            .zip(&partial.volume)
            .map(|((&min, &max), &volume)| {
                if volume == 0 {
                    0
                } else {
                    (max - min + 1) as u64
                }
            })
            .collect();

        let mut seeds = partial.seeds;
        seeds[0] = 0;

        Self {
            surface: partial.surface,
            depth,
            volume: partial.volume,
            seeds,
        }
    }
}
