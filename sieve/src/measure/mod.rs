//! Per-region geometric measures.
//!
//! The three base measures (surface, depth, volume) come from one shared
//! traversal. Extended measures are pluggable [`RegionMeasure`]s that pull
//! shared analyses from a lazily filled [`MeasureContext`].

mod base;
mod extended;

use std::cell::OnceCell;
use std::fmt;
use std::ops::BitOr;

use common::Shape;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::labeling::LabelMap;

pub use base::BaseMeasures;
pub use extended::{Circularity, Eccentricity, HoleCount, HoleDensity, Perimeter, RootDistance};

// ============================================================================
// Measure kinds and sets
// ============================================================================

/// A geometric measure of a region. The discriminant is the measure's bit
/// position in a measure mask.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum MeasureKind {
    /// Cells covered in the XY plane.
    Surface,
    /// Extent along the depth axis, in cells.
    Depth,
    /// Cell count.
    Volume,
    Perimeter,
    Circularity,
    RootDistance,
    HoleCount,
    HoleDensity,
    Eccentricity,
}

impl MeasureKind {
    #[inline]
    pub const fn bit(self) -> u16 {
        1 << self as u16
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the measure needs the extended capability.
    #[inline]
    pub const fn is_extended(self) -> bool {
        MeasureSet::EXTENDED.0 & self.bit() != 0
    }
}

/// Set of active measure kinds.
///
/// Bits follow the integer mask: surface=1, depth=2, volume=4, then
/// perimeter, circularity, root-distance, hole-count, hole-density and
/// eccentricity from 8 up to 256. Serialized as a list of kind names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<MeasureKind>", into = "Vec<MeasureKind>")]
pub struct MeasureSet(u16);

impl MeasureSet {
    pub const EMPTY: Self = Self(0);
    pub const BASE: Self = Self(0b0_0000_0111);
    pub const EXTENDED: Self = Self(0b1_1111_1000);
    pub const ALL: Self = Self(0b1_1111_1111);

    /// Build a set from an integer mask. Bits that name no measure are an
    /// error.
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits & !u32::from(Self::ALL.0) != 0 {
            return Err(Error::UnknownMeasureBits { bits });
        }
        Ok(Self(bits as u16))
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn contains(self, kind: MeasureKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub const fn with(self, kind: MeasureKind) -> Self {
        Self(self.0 | kind.bit())
    }

    #[inline]
    pub fn insert(&mut self, kind: MeasureKind) {
        self.0 |= kind.bit();
    }

    #[inline]
    pub fn remove(&mut self, kind: MeasureKind) {
        self.0 &= !kind.bit();
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Active kinds in bit order.
    pub fn iter(self) -> impl Iterator<Item = MeasureKind> {
        MeasureKind::iter().filter(move |&kind| self.contains(kind))
    }
}

impl BitOr for MeasureSet {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOr<MeasureKind> for MeasureSet {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: MeasureKind) -> Self {
        self.with(rhs)
    }
}

impl From<MeasureKind> for MeasureSet {
    #[inline]
    fn from(kind: MeasureKind) -> Self {
        Self(kind.bit())
    }
}

impl FromIterator<MeasureKind> for MeasureSet {
    fn from_iter<I: IntoIterator<Item = MeasureKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl From<Vec<MeasureKind>> for MeasureSet {
    fn from(kinds: Vec<MeasureKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<MeasureSet> for Vec<MeasureKind> {
    fn from(set: MeasureSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Display for MeasureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            let name: &'static str = kind.into();
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Runtime switches deciding which measures may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub extended: bool,
}

impl Capabilities {
    pub const EXTENDED: Self = Self { extended: true };

    /// Fail with `UnsupportedMeasure` on the first extended kind requested
    /// while extended measures are disabled.
    pub fn check(self, measures: MeasureSet) -> Result<()> {
        if self.extended {
            return Ok(());
        }
        match measures.iter().find(|kind| kind.is_extended()) {
            Some(kind) => Err(Error::UnsupportedMeasure { kind }),
            None => Ok(()),
        }
    }
}

/// Grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Depth axis used when none is configured: z for 3-D grids, y for 2-D.
    pub const fn default_for(shape: Shape) -> Self {
        if shape.is_3d() {
            Self::Z
        } else {
            Self::Y
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn pick(self, (x, y, z): (usize, usize, usize)) -> usize {
        match self {
            Self::X => x,
            Self::Y => y,
            Self::Z => z,
        }
    }
}

// ============================================================================
// Region records
// ============================================================================

/// Measures of one labeled region. Only active kinds carry a value.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub label: u32,
    values: [f64; MeasureKind::COUNT],
    active: MeasureSet,
}

impl RegionRecord {
    pub fn new(label: u32, active: MeasureSet) -> Self {
        Self {
            label,
            values: [0.0; MeasureKind::COUNT],
            active,
        }
    }

    #[inline]
    pub fn get(&self, kind: MeasureKind) -> Option<f64> {
        self.active
            .contains(kind)
            .then(|| self.values[kind.index()])
    }

    #[inline]
    pub(crate) fn set(&mut self, kind: MeasureKind, value: f64) {
        debug_assert!(self.active.contains(kind));
        self.values[kind.index()] = value;
    }

    #[inline]
    pub fn active(&self) -> MeasureSet {
        self.active
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeasureKind, f64)> + '_ {
        self.active
            .iter()
            .map(move |kind| (kind, self.values[kind.index()]))
    }
}

// ============================================================================
// Measure context and pluggable measures
// ============================================================================

/// Shared, lazily computed analyses of one label map.
///
/// Each analysis runs at most once per context, however many measures use it.
pub struct MeasureContext<'a> {
    labels: &'a LabelMap,
    depth_axis: Axis,
    base: OnceCell<BaseMeasures>,
    boundary_faces: OnceCell<Vec<u64>>,
    hole_counts: OnceCell<Vec<u64>>,
}

impl<'a> MeasureContext<'a> {
    pub fn new(labels: &'a LabelMap, depth_axis: Axis) -> Self {
        Self {
            labels,
            depth_axis,
            base: OnceCell::new(),
            boundary_faces: OnceCell::new(),
            hole_counts: OnceCell::new(),
        }
    }

    #[inline]
    pub fn labels(&self) -> &'a LabelMap {
        self.labels
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.labels.num_labels()
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.labels.shape()
    }

    #[inline]
    pub fn depth_axis(&self) -> Axis {
        self.depth_axis
    }

    /// Surface, depth, volume and seed cell per label.
    pub fn base(&self) -> &BaseMeasures {
        self.base
            .get_or_init(|| BaseMeasures::compute(self.labels, self.depth_axis))
    }

    /// Cell faces between each region and the outside, indexed by label.
    pub fn boundary_faces(&self) -> &[u64] {
        self.boundary_faces
            .get_or_init(|| extended::count_boundary_faces(self.labels))
    }

    /// Enclosed background components per region, indexed by label.
    pub fn hole_counts(&self) -> &[u64] {
        self.hole_counts
            .get_or_init(|| extended::count_holes(self.labels))
    }
}

/// An extended measure computed for every region at once.
pub trait RegionMeasure: Send + Sync {
    fn kind(&self) -> MeasureKind;

    /// One value per label, indexed by label. Index 0 is ignored.
    ///
    /// Must be deterministic and defined for every non-empty region.
    fn compute(&self, ctx: &MeasureContext<'_>) -> Vec<f64>;
}

// ============================================================================
// Measure engine
// ============================================================================

/// Computes region records for a label map.
pub struct MeasureEngine {
    capabilities: Capabilities,
    depth_axis: Option<Axis>,
    extended: Vec<Box<dyn RegionMeasure>>,
}

impl fmt::Debug for MeasureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasureEngine")
            .field("capabilities", &self.capabilities)
            .field("depth_axis", &self.depth_axis)
            .field(
                "extended",
                &self.extended.iter().map(|m| m.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for MeasureEngine {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl MeasureEngine {
    /// Engine with the default extended measures registered.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            depth_axis: None,
            extended: extended::default_measures(),
        }
    }

    /// Measure depth along `axis` instead of the grid's default axis.
    pub fn with_depth_axis(mut self, axis: Option<Axis>) -> Self {
        self.depth_axis = axis;
        self
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Replace the measure registered for the same kind, returning it.
    ///
    /// Base kinds are fixed and cannot be replaced.
    pub fn register(&mut self, measure: Box<dyn RegionMeasure>) -> Option<Box<dyn RegionMeasure>> {
        let kind = measure.kind();
        assert!(
            kind.is_extended(),
            "only extended measures can be registered, got '{kind}'"
        );
        match self.extended.iter().position(|m| m.kind() == kind) {
            Some(pos) => Some(std::mem::replace(&mut self.extended[pos], measure)),
            None => {
                self.extended.push(measure);
                None
            }
        }
    }

    pub fn measure(&self, kind: MeasureKind) -> Option<&dyn RegionMeasure> {
        self.extended
            .iter()
            .find(|m| m.kind() == kind)
            .map(|m| m.as_ref())
    }

    /// Check that every requested kind can be computed.
    pub fn validate(&self, measures: MeasureSet) -> Result<()> {
        self.capabilities.check(measures)?;
        match measures
            .iter()
            .filter(|kind| kind.is_extended())
            .find(|&kind| self.measure(kind).is_none())
        {
            Some(kind) => Err(Error::UnsupportedMeasure { kind }),
            None => Ok(()),
        }
    }

    /// One record per label, in label order, with the active kinds filled.
    pub fn compute(&self, labels: &LabelMap, measures: MeasureSet) -> Result<Vec<RegionRecord>> {
        self.validate(measures)?;

        let num_labels = labels.num_labels();
        let mut records: Vec<RegionRecord> = (1..=num_labels as u32)
            .map(|label| RegionRecord::new(label, measures))
            .collect();
        if records.is_empty() || measures.is_empty() {
            return Ok(records);
        }

        let depth_axis = self
            .depth_axis
            .unwrap_or_else(|| Axis::default_for(labels.shape()));
        let ctx = MeasureContext::new(labels, depth_axis);

        if !measures.intersection(MeasureSet::BASE).is_empty() {
            let base = ctx.base();
            for record in records.iter_mut() {
                let l = record.label as usize;
                for (kind, values) in [
                    (MeasureKind::Surface, &base.surface),
                    (MeasureKind::Depth, &base.depth),
                    (MeasureKind::Volume, &base.volume),
                ] {
                    if measures.contains(kind) {
                        record.set(kind, values[l] as f64);
                    }
                }
            }
        }

        for kind in measures.iter().filter(|kind| kind.is_extended()) {
            let Some(measure) = self.measure(kind) else {
                return Err(Error::UnsupportedMeasure { kind });
            };
            let values = measure.compute(&ctx);
            assert_eq!(
                values.len(),
                num_labels + 1,
                "measure '{kind}' returned {} values for {num_labels} labels",
                values.len()
            );
            for record in records.iter_mut() {
                record.set(kind, values[record.label as usize]);
            }
        }

        tracing::debug!(
            num_labels,
            measures = %measures,
            depth_axis = %depth_axis,
            "Computed region measures"
        );

        Ok(records)
    }
}
