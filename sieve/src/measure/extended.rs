//! Default extended measures and the shared analyses behind them.

use std::collections::VecDeque;
use std::f64::consts::PI;

use common::BitBuffer3;
use glam::{DMat3, DVec3};
use rayon::prelude::*;

use super::{MeasureContext, MeasureKind, RegionMeasure};
use crate::connectivity::Connectivity;
use crate::labeling::LabelMap;

pub(super) fn default_measures() -> Vec<Box<dyn RegionMeasure>> {
    vec![
        Box::new(Perimeter),
        Box::new(Circularity),
        Box::new(RootDistance),
        Box::new(HoleCount),
        Box::new(HoleDensity),
        Box::new(Eccentricity),
    ]
}

// ============================================================================
// Shared analyses
// ============================================================================

/// Count, per label, the cell faces that border another label, the
/// background or the outside of the grid.
pub(super) fn count_boundary_faces(labels: &LabelMap) -> Vec<u64> {
    let shape = labels.shape();
    let cells = labels.labels();
    let len = labels.num_labels() + 1;
    let faces = Connectivity::face(shape.ndim()).offsets();

    let count_row = |mut acc: Vec<u64>, row: usize| {
        let y = row % shape.height;
        let z = row / shape.height;
        for x in 0..shape.width {
            let l = cells[shape.index(x, y, z)];
            if l == 0 {
                continue;
            }
            for o in &faces {
                let exposed = match shape.offset((x, y, z), (o.x, o.y, o.z)) {
                    Some((nx, ny, nz)) => cells[shape.index(nx, ny, nz)] != l,
                    None => true,
                };
                if exposed {
                    acc[l as usize] += 1;
                }
            }
        }
        acc
    };

    (0..shape.num_rows())
        .into_par_iter()
        .fold(|| vec![0u64; len], count_row)
        .reduce(
            || vec![0u64; len],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(&b) {
                    *x += y;
                }
                a
            },
        )
}

/// Count, per label, the background components enclosed by the region.
///
/// Background is labeled with the complement connectivity. A background
/// component is a hole when none of its cells lies on the grid border; it
/// belongs to the region holding the cell one step before its first cell
/// along the slowest axis (z in 3-D, y in 2-D).
pub(super) fn count_holes(labels: &LabelMap) -> Vec<u64> {
    let shape = labels.shape();
    let cells = labels.labels();
    let background = BitBuffer3::from_fn(shape, |idx| cells[idx] == 0);
    let holes = LabelMap::from_mask(&background, labels.connectivity().complement());
    let num_holes = holes.num_labels();

    let mut first = vec![usize::MAX; num_holes + 1];
    let mut enclosed = vec![true; num_holes + 1];
    for (idx, &h) in holes.labels().iter().enumerate() {
        if h == 0 {
            continue;
        }
        let h = h as usize;
        if first[h] == usize::MAX {
            first[h] = idx;
        }
        if enclosed[h] {
            let (x, y, z) = shape.coords(idx);
            if shape.is_border(x, y, z) {
                enclosed[h] = false;
            }
        }
    }

    let stride = if shape.is_3d() {
        shape.plane_len()
    } else {
        shape.width
    };
    let mut counts = vec![0u64; labels.num_labels() + 1];
    for h in (1..=num_holes).filter(|&h| enclosed[h]) {
        let owner = cells[first[h] - stride] as usize;
        debug_assert_ne!(owner, 0, "hole {h} is not bounded by foreground");
        counts[owner] += 1;
    }

    tracing::debug!(
        background_components = num_holes,
        holes = counts.iter().sum::<u64>(),
        "Counted enclosed holes"
    );

    counts
}

// ============================================================================
// Default measures
// ============================================================================

/// Number of exposed cell faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct Perimeter;

impl RegionMeasure for Perimeter {
    fn kind(&self) -> MeasureKind {
        MeasureKind::Perimeter
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        ctx.boundary_faces().iter().map(|&f| f as f64).collect()
    }
}

/// Compactness in percent: 100 for a disc (2-D) or a ball (3-D).
///
/// `100·4π·A/P²` in 2-D with A the surface, `100·36π·V²/P³` in 3-D with V
/// the volume; P is the perimeter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Circularity;

impl RegionMeasure for Circularity {
    fn kind(&self) -> MeasureKind {
        MeasureKind::Circularity
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        let base = ctx.base();
        let faces = ctx.boundary_faces();
        let is_3d = ctx.shape().is_3d();

        faces
            .iter()
            .enumerate()
            .map(|(l, &p)| {
                if p == 0 {
                    return 0.0;
                }
                let p = p as f64;
                if is_3d {
                    let v = base.volume[l] as f64;
                    100.0 * 36.0 * PI * v * v / (p * p * p)
                } else {
                    let a = base.surface[l] as f64;
                    100.0 * 4.0 * PI * a / (p * p)
                }
            })
            .collect()
    }
}

/// Largest step distance from the region's seed cell to any of its cells,
/// moving through the region under its own connectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootDistance;

impl RegionMeasure for RootDistance {
    fn kind(&self) -> MeasureKind {
        MeasureKind::RootDistance
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        let labels = ctx.labels();
        let shape = labels.shape();
        let cells = labels.labels();
        let seeds = &ctx.base().seeds;
        let offsets = labels.connectivity().offsets();
        let num_labels = labels.num_labels();

        // Regions are disjoint, so one BFS from all seeds at once measures
        // each region from its own seed.
        let mut dist = vec![u32::MAX; shape.len()];
        let mut queue = VecDeque::with_capacity(num_labels);
        for &seed in &seeds[1..] {
            dist[seed] = 0;
            queue.push_back(seed);
        }

        let mut max_dist = vec![0u32; num_labels + 1];
        while let Some(idx) = queue.pop_front() {
            let l = cells[idx];
            let d = dist[idx];
            max_dist[l as usize] = max_dist[l as usize].max(d);

            let cell = shape.coords(idx);
            for o in &offsets {
                let Some((x, y, z)) = shape.offset(cell, (o.x, o.y, o.z)) else {
                    continue;
                };
                let n = shape.index(x, y, z);
                if cells[n] == l && dist[n] == u32::MAX {
                    dist[n] = d + 1;
                    queue.push_back(n);
                }
            }
        }

        max_dist.into_iter().map(f64::from).collect()
    }
}

/// Number of enclosed background components.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoleCount;

impl RegionMeasure for HoleCount {
    fn kind(&self) -> MeasureKind {
        MeasureKind::HoleCount
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        ctx.hole_counts().iter().map(|&h| h as f64).collect()
    }
}

/// Holes per 100 cells of surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoleDensity;

impl RegionMeasure for HoleDensity {
    fn kind(&self) -> MeasureKind {
        MeasureKind::HoleDensity
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        let surface = &ctx.base().surface;
        ctx.hole_counts()
            .iter()
            .zip(surface)
            .map(|(&h, &s)| if s == 0 { 0.0 } else { 100.0 * h as f64 / s as f64 })
            .collect()
    }
}

/// Elongation in percent from the coordinate covariance:
/// `100·(1 − √(λmin/λmax))`. 0 for isotropic regions, 100 for a straight line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eccentricity;

/// First and second coordinate moments, relative to the region's seed.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    n: f64,
    sum: DVec3,
    /// xx, yy, zz
    sum_sq: DVec3,
    /// xy, xz, yz
    sum_cross: DVec3,
}

impl Moments {
    fn covariance(&self) -> DMat3 {
        let mean = self.sum / self.n;
        let var = self.sum_sq / self.n - mean * mean;
        let xy = self.sum_cross.x / self.n - mean.x * mean.y;
        let xz = self.sum_cross.y / self.n - mean.x * mean.z;
        let yz = self.sum_cross.z / self.n - mean.y * mean.z;
        DMat3::from_cols(
            DVec3::new(var.x, xy, xz),
            DVec3::new(xy, var.y, yz),
            DVec3::new(xz, yz, var.z),
        )
    }
}

/// Smallest and largest eigenvalue of a symmetric 2x2 matrix.
fn eigen_range_2x2(a: f64, b: f64, c: f64) -> (f64, f64) {
    let mean = 0.5 * (a + c);
    let r = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    (mean - r, mean + r)
}

/// Smallest and largest eigenvalue of a symmetric 3x3 matrix (closed form).
pub(super) fn eigen_range_3x3(m: DMat3) -> (f64, f64) {
    let off = m.y_axis.x * m.y_axis.x + m.z_axis.x * m.z_axis.x + m.z_axis.y * m.z_axis.y;
    let diag = DVec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z);
    if off <= f64::EPSILON * diag.length_squared().max(1.0) {
        return (diag.min_element(), diag.max_element());
    }

    let q = diag.element_sum() / 3.0;
    let shifted = diag - DVec3::splat(q);
    let p = ((shifted.length_squared() + 2.0 * off) / 6.0).sqrt();
    let b = (m - DMat3::from_diagonal(DVec3::splat(q))) * (1.0 / p);
    let r = (b.determinant() / 2.0).clamp(-1.0, 1.0);
    let phi = r.acos() / 3.0;

    let largest = q + 2.0 * p * phi.cos();
    let smallest = q + 2.0 * p * (phi + 2.0 * PI / 3.0).cos();
    (smallest, largest)
}

impl RegionMeasure for Eccentricity {
    fn kind(&self) -> MeasureKind {
        MeasureKind::Eccentricity
    }

    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64> {
        let labels = ctx.labels();
        let shape = labels.shape();
        let cells = labels.labels();
        let seeds = &ctx.base().seeds;
        let is_3d = shape.is_3d();

        let origins: Vec<DVec3> = seeds
            .iter()
            .map(|&seed| {
                let (x, y, z) = shape.coords(seed);
                DVec3::new(x as f64, y as f64, z as f64)
            })
            .collect();

        // Storage order keeps the floating point sums reproducible.
        let mut moments = vec![Moments::default(); labels.num_labels() + 1];
        for (idx, &l) in cells.iter().enumerate() {
            if l == 0 {
                continue;
            }
            let (x, y, z) = shape.coords(idx);
            let p = DVec3::new(x as f64, y as f64, z as f64) - origins[l as usize];
            let m = &mut moments[l as usize];
            m.n += 1.0;
            m.sum += p;
            m.sum_sq += p * p;
            m.sum_cross += DVec3::new(p.x * p.y, p.x * p.z, p.y * p.z);
        }

        moments
            .iter()
            .map(|m| {
                if m.n < 2.0 {
                    return 0.0;
                }
                let cov = m.covariance();
                let (min, max) = if is_3d {
                    eigen_range_3x3(cov)
                } else {
                    eigen_range_2x2(cov.x_axis.x, cov.y_axis.x, cov.y_axis.y)
                };
                if max <= f64::EPSILON {
                    return 0.0;
                }
                100.0 * (1.0 - (min.max(0.0) / max).sqrt())
            })
            .collect()
    }
}
