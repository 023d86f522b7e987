//! Threshold selection of regions.

use serde::{Deserialize, Serialize};

use crate::measure::{MeasureKind, MeasureSet, RegionRecord};

/// One integer threshold per measure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Thresholds {
    pub surface: i64,
    pub depth: i64,
    pub volume: i64,
    pub perimeter: i64,
    pub circularity: i64,
    pub root_distance: i64,
    pub hole_count: i64,
    pub hole_density: i64,
    pub eccentricity: i64,
}

impl Thresholds {
    pub fn get(&self, kind: MeasureKind) -> i64 {
        match kind {
            MeasureKind::Surface => self.surface,
            MeasureKind::Depth => self.depth,
            MeasureKind::Volume => self.volume,
            MeasureKind::Perimeter => self.perimeter,
            MeasureKind::Circularity => self.circularity,
            MeasureKind::RootDistance => self.root_distance,
            MeasureKind::HoleCount => self.hole_count,
            MeasureKind::HoleDensity => self.hole_density,
            MeasureKind::Eccentricity => self.eccentricity,
        }
    }

    pub fn set(&mut self, kind: MeasureKind, value: i64) {
        let slot = match kind {
            MeasureKind::Surface => &mut self.surface,
            MeasureKind::Depth => &mut self.depth,
            MeasureKind::Volume => &mut self.volume,
            MeasureKind::Perimeter => &mut self.perimeter,
            MeasureKind::Circularity => &mut self.circularity,
            MeasureKind::RootDistance => &mut self.root_distance,
            MeasureKind::HoleCount => &mut self.hole_count,
            MeasureKind::HoleDensity => &mut self.hole_density,
            MeasureKind::Eccentricity => &mut self.eccentricity,
        };
        *slot = value;
    }

    pub fn with(mut self, kind: MeasureKind, value: i64) -> Self {
        self.set(kind, value);
        self
    }
}

/// Keep table indexed by label. Label 0 (background) is never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Survivors {
    keep: Vec<bool>,
}

impl Survivors {
    /// Every one of `num_labels` regions kept.
    pub fn all(num_labels: usize) -> Self {
        let mut keep = vec![true; num_labels + 1];
        keep[0] = false;
        Self { keep }
    }

    /// Keep exactly `kept` out of `num_labels` regions.
    pub fn from_labels(num_labels: usize, kept: impl IntoIterator<Item = u32>) -> Self {
        let mut keep = vec![false; num_labels + 1];
        for label in kept {
            assert!(
                (1..=num_labels).contains(&(label as usize)),
                "label {label} out of range 1..={num_labels}"
            );
            keep[label as usize] = true;
        }
        Self { keep }
    }

    #[inline]
    pub fn contains(&self, label: u32) -> bool {
        self.keep.get(label as usize).copied().unwrap_or(false)
    }

    /// Number of regions considered.
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.keep.len() - 1
    }

    /// Number of kept regions.
    pub fn len(&self) -> usize {
        self.keep.iter().filter(|&&k| k).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rejected regions.
    pub fn removed(&self) -> usize {
        self.num_labels() - self.len()
    }

    /// Kept labels in increasing order.
    pub fn labels(&self) -> impl Iterator<Item = u32> + '_ {
        self.keep
            .iter()
            .enumerate()
            .filter(|&(_, &k)| k)
            .map(|(l, _)| l as u32)
    }
}

/// Whether `value` passes `threshold`: `>=` when maximising, `<=` otherwise.
#[inline]
pub fn passes_threshold(value: f64, threshold: i64, maximise: bool) -> bool {
    let threshold = threshold as f64;
    if maximise {
        value >= threshold
    } else {
        value <= threshold
    }
}

/// Whether a region passes every active kind in `measures`.
pub fn passes(
    record: &RegionRecord,
    measures: MeasureSet,
    thresholds: &Thresholds,
    maximise: bool,
) -> bool {
    measures.iter().all(|kind| {
        let value = record.get(kind);
        debug_assert!(value.is_some(), "measure '{kind}' was not computed");
        value.is_some_and(|v| passes_threshold(v, thresholds.get(kind), maximise))
    })
}

/// Decide which regions survive. With no active kinds every region survives.
pub fn select(
    records: &[RegionRecord],
    measures: MeasureSet,
    thresholds: &Thresholds,
    maximise: bool,
) -> Survivors {
    let num_labels = records.iter().map(|r| r.label as usize).max().unwrap_or(0);
    let mut keep = vec![false; num_labels + 1];
    for record in records {
        keep[record.label as usize] = passes(record, measures, thresholds, maximise);
    }
    Survivors { keep }
}
