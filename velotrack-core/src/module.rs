//! Detector modules.

use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A detector plane, described by its position along the detector and the
/// range of hits it owns inside its event's flat hit array.
///
/// Module groups produced by merging consecutive modules are also `Module`
/// values: their range simply spans all member modules.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    /// Sequence index along the detector.
    pub number: usize,
    /// Position along the beam axis.
    pub z: f64,
    /// First hit index (inclusive).
    pub hit_start: usize,
    /// Last hit index (exclusive).
    pub hit_end: usize,
}

impl Module {
    /// Creates a module covering `hit_start..hit_end`.
    #[must_use]
    pub fn new(number: usize, z: f64, hit_start: usize, hit_end: usize) -> Self {
        Self {
            number,
            z,
            hit_start,
            hit_end,
        }
    }

    /// Hit index range owned by this module.
    #[inline]
    #[must_use]
    pub fn hit_range(&self) -> Range<usize> {
        self.hit_start..self.hit_end
    }

    /// Number of hits on the module.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hit_end.saturating_sub(self.hit_start)
    }

    /// Returns true if no hit was recorded on the module.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
