//! Registry of hits claimed by tracks during one reconstruction run.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use velotrack_core::HitId;

/// Identity of a candidate track within one reconstruction run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

/// Hits claimed by sufficiently long tracks, each with its first claimant.
///
/// Flags are only ever added: once a hit is flagged it stays flagged, and
/// its owner never changes, for the rest of the run.
#[derive(Debug, Default, Clone)]
pub struct FlaggedHits {
    owners: HashMap<HitId, TrackId>,
}

impl FlaggedHits {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags a hit on behalf of `owner`.
    ///
    /// Returns true if the hit was not flagged before. An already flagged
    /// hit keeps its original owner.
    pub fn flag(&mut self, hit: HitId, owner: TrackId) -> bool {
        match self.owners.entry(hit) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(owner);
                true
            }
        }
    }

    /// Flags every hit in `hits` on behalf of `owner`.
    pub fn flag_all<I>(&mut self, hits: I, owner: TrackId)
    where
        I: IntoIterator<Item = HitId>,
    {
        for hit in hits {
            self.flag(hit, owner);
        }
    }

    /// Returns true if any track has claimed the hit.
    #[inline]
    #[must_use]
    pub fn is_flagged(&self, hit: HitId) -> bool {
        self.owners.contains_key(&hit)
    }

    /// The track that first claimed the hit.
    #[inline]
    #[must_use]
    pub fn owner(&self, hit: HitId) -> Option<TrackId> {
        self.owners.get(&hit).copied()
    }

    /// Returns true if a track other than `track` has claimed the hit.
    #[inline]
    #[must_use]
    pub fn is_claimed_by_other(&self, hit: HitId, track: TrackId) -> bool {
        self.owner(hit).is_some_and(|owner| owner != track)
    }

    /// Number of flagged hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns true if nothing has been flagged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_monotonic() {
        let mut flagged = FlaggedHits::new();
        assert!(flagged.is_empty());

        assert!(flagged.flag(10, TrackId(0)));
        assert!(!flagged.flag(10, TrackId(1)));
        assert_eq!(flagged.owner(10), Some(TrackId(0)));

        flagged.flag_all([10, 11, 12], TrackId(1));
        assert_eq!(flagged.len(), 3);
        assert_eq!(flagged.owner(10), Some(TrackId(0)));
        assert_eq!(flagged.owner(12), Some(TrackId(1)));
        assert!(flagged.is_flagged(11));
        assert!(!flagged.is_flagged(13));
    }

    #[test]
    fn test_claimed_by_other() {
        let mut flagged = FlaggedHits::new();
        flagged.flag(1, TrackId(4));
        assert!(!flagged.is_claimed_by_other(1, TrackId(4)));
        assert!(flagged.is_claimed_by_other(1, TrackId(5)));
        assert!(!flagged.is_claimed_by_other(2, TrackId(5)));
    }
}
