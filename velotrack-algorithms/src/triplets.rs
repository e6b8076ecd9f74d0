//! Compatible-triplet index.
//!
//! For every seeding pair of module groups `(m0, m1)` the index stores, for
//! each hit pair `(h0 in m0, h1 in m1)`, the single best third hit in the
//! third-hit group together with its scatter. It is built once per event and
//! turns the cubic seeding search into a pair lookup.
//!
//! Entries keep scan order (h0 in m0 order, then h1 in m1 order), so walking
//! the index is deterministic; hash maps are only used to find an entry.

use std::collections::HashMap;

use log::trace;
use velotrack_core::{Error, Event, Hit, HitId, Module, Result};

use crate::compatibility::forward_scatter;
use crate::merge::{group_pairs, third_hit_group};

/// Best continuation of a hit pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triplet {
    /// Hit in the second group of the pair.
    pub second: Hit,
    /// Best third hit.
    pub third: Hit,
    /// Scatter of the third hit.
    pub scatter: f64,
}

/// All stored triplets sharing one first hit.
#[derive(Clone, Debug)]
pub struct FirstHitTriplets {
    first: Hit,
    triplets: Vec<Triplet>,
    by_second: HashMap<HitId, usize>,
}

impl FirstHitTriplets {
    fn new(first: Hit) -> Self {
        Self {
            first,
            triplets: Vec::new(),
            by_second: HashMap::new(),
        }
    }

    fn push(&mut self, triplet: Triplet) {
        self.by_second.insert(triplet.second.id, self.triplets.len());
        self.triplets.push(triplet);
    }

    /// The shared first hit.
    #[must_use]
    pub fn first(&self) -> &Hit {
        &self.first
    }

    /// Triplets in scan order of their second hit.
    pub fn iter(&self) -> impl Iterator<Item = &Triplet> {
        self.triplets.iter()
    }

    /// Triplet continuing `(first, second)`.
    #[must_use]
    pub fn get(&self, second: HitId) -> Option<&Triplet> {
        self.by_second.get(&second).map(|&i| &self.triplets[i])
    }

    /// Number of stored triplets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triplets.len()
    }

    /// Returns true if no triplet is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }
}

/// Triplets of one seeding group pair, keyed by first and second hit.
#[derive(Clone, Debug, Default)]
pub struct GroupTriplets {
    entries: Vec<FirstHitTriplets>,
    by_first: HashMap<HitId, usize>,
}

impl GroupTriplets {
    /// Scans every `(h0, h1, h2)` combination and keeps, per pair, the third
    /// hit with the smallest scatter below `max_scatter`. Ties go to the
    /// first hit scanned.
    #[must_use]
    pub fn scan(hits0: &[Hit], hits1: &[Hit], hits2: &[Hit], max_scatter: f64) -> Self {
        let mut group = Self::default();
        for h0 in hits0 {
            for h1 in hits1 {
                let mut best: Option<(Hit, f64)> = None;
                let mut best_scatter = max_scatter;
                for h2 in hits2 {
                    if let Some(scatter) = forward_scatter(h0, h1, h2) {
                        if scatter < best_scatter {
                            best = Some((*h2, scatter));
                            best_scatter = scatter;
                        }
                    }
                }
                if let Some((third, scatter)) = best {
                    group.insert(
                        *h0,
                        Triplet {
                            second: *h1,
                            third,
                            scatter,
                        },
                    );
                }
            }
        }
        group
    }

    fn insert(&mut self, first: Hit, triplet: Triplet) {
        let index = match self.by_first.get(&first.id) {
            Some(&index) => index,
            None => {
                self.by_first.insert(first.id, self.entries.len());
                self.entries.push(FirstHitTriplets::new(first));
                self.entries.len() - 1
            }
        };
        self.entries[index].push(triplet);
    }

    /// Triplet continuing the pair `(first, second)`.
    #[must_use]
    pub fn get(&self, first: HitId, second: HitId) -> Option<&Triplet> {
        self.by_first
            .get(&first)
            .and_then(|&i| self.entries[i].get(second))
    }

    /// Entries in scan order of their first hit.
    pub fn iter(&self) -> impl Iterator<Item = &FirstHitTriplets> {
        self.entries.iter()
    }

    /// Number of stored triplets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(FirstHitTriplets::len).sum()
    }

    /// Returns true if no triplet is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-event triplet index, addressed by the index of the pair's first
/// (farther) module group.
#[derive(Clone, Debug, Default)]
pub struct TripletTrie {
    groups: Vec<Option<GroupTriplets>>,
}

impl TripletTrie {
    /// Builds the index for every `(m0, m1)` pair `forward_offset` groups apart.
    ///
    /// # Errors
    /// [`Error::ConfigError`] when a group's number does not address a group
    /// of `groups`.
    pub fn build(
        event: &Event,
        groups: &[Module],
        forward_offset: usize,
        max_scatter: f64,
    ) -> Result<Self> {
        let mut trie = Self {
            groups: vec![None; groups.len()],
        };
        for (m0, m1) in group_pairs(groups, forward_offset) {
            let m2 = third_hit_group(groups, m1)?;
            let triplets = GroupTriplets::scan(
                event.hits_in(m0),
                event.hits_in(m1),
                event.hits_in(m2),
                max_scatter,
            );
            trace!(
                "group pair ({}, {}) with third group {}: {} triplets",
                m0.number,
                m1.number,
                m2.number,
                triplets.len()
            );
            let slot = trie.groups.get_mut(m0.number).ok_or_else(|| {
                Error::config(format!(
                    "module group number {} out of range ({} groups)",
                    m0.number,
                    groups.len()
                ))
            })?;
            *slot = Some(triplets);
        }
        Ok(trie)
    }

    /// Triplets of the pair whose first group is `group`.
    #[must_use]
    pub fn group(&self, group: usize) -> Option<&GroupTriplets> {
        self.groups.get(group).and_then(Option::as_ref)
    }

    /// Total number of stored triplets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().flatten().map(GroupTriplets::len).sum()
    }

    /// Returns true if no triplet is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
