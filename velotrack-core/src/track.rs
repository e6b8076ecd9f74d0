//! Reconstructed and in-flight tracks.

use std::fmt;

use crate::hit::{Hit, HitId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered sequence of hits attributed to one particle.
///
/// Hits are kept in the order they were attached, most recent last. While a
/// track is being followed it only grows; the two miss flags record whether
/// the last and the one-before-last steps failed to extend it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Hits in attachment order.
    pub hits: Vec<Hit>,
    /// The most recent step found no continuation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub missed_last_module: bool,
    /// The step before the most recent one found no continuation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub missed_penultimate_module: bool,
}

impl Track {
    /// Creates a track from its initial hits, with no recorded misses.
    #[must_use]
    pub fn new(hits: Vec<Hit>) -> Self {
        Self {
            hits,
            missed_last_module: false,
            missed_penultimate_module: false,
        }
    }

    /// Appends a hit.
    pub fn push(&mut self, hit: Hit) {
        self.hits.push(hit);
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the track has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }

    /// Hit ids in attachment order.
    #[must_use]
    pub fn hit_ids(&self) -> Vec<HitId> {
        self.hits.iter().map(|hit| hit.id).collect()
    }

    /// The second-to-last and last hit, which define the extrapolation line.
    #[must_use]
    pub fn last_two(&self) -> Option<(Hit, Hit)> {
        match self.hits.as_slice() {
            [.., h0, h1] => Some((*h0, *h1)),
            _ => None,
        }
    }

    /// Returns true if either of the last two steps missed.
    #[must_use]
    pub fn missed_recently(&self) -> bool {
        self.missed_last_module || self.missed_penultimate_module
    }

    /// Shifts the miss history after a successful extension.
    pub fn record_extension(&mut self) {
        self.missed_penultimate_module = self.missed_last_module;
        self.missed_last_module = false;
    }

    /// Shifts the miss history after a failed extension.
    ///
    /// Returns true when both of the last two steps have now missed, i.e.
    /// the track should stop.
    pub fn record_miss(&mut self) -> bool {
        self.missed_penultimate_module = self.missed_last_module;
        self.missed_last_module = true;
        self.missed_penultimate_module
    }
}

impl FromIterator<Hit> for Track {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track with {} hits: [", self.hits.len())?;
        for (i, hit) in self.hits.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{hit}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Track {
        (0..3)
            .map(|i| Hit::new(i, 0.0, 0.0, f64::from(i)))
            .collect()
    }

    #[test]
    fn test_track_operations() {
        let mut track = seed();
        assert_eq!(track.len(), 3);
        assert!(!track.is_empty());
        track.push(Hit::new(9, 0.0, 0.0, 3.0));
        assert_eq!(track.hit_ids(), vec![0, 1, 2, 9]);
        let (h0, h1) = track.last_two().unwrap();
        assert_eq!((h0.id, h1.id), (2, 9));
        assert!(Track::new(vec![Hit::new(0, 0.0, 0.0, 0.0)]).last_two().is_none());
    }

    #[test]
    fn test_miss_history() {
        let mut track = seed();
        assert!(!track.missed_recently());

        assert!(!track.record_miss());
        assert!(track.missed_last_module);
        assert!(track.missed_recently());

        track.record_extension();
        assert!(!track.missed_last_module);
        assert!(track.missed_penultimate_module);
        assert!(track.missed_recently());

        track.record_extension();
        assert!(!track.missed_recently());

        assert!(!track.record_miss());
        assert!(track.record_miss());
    }

    #[test]
    fn test_track_display() {
        let track = Track::new(vec![Hit::new(1, 0.0, 0.0, 1.0), Hit::new(2, 0.0, 0.0, 2.0)]);
        assert_eq!(track.to_string(), "Track with 2 hits: [#1 {0, 0, 1}, #2 {0, 0, 2}]");
    }
}
