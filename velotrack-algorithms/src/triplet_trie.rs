//! Triplet-trie track following.
//!
//! **This is the primary reconstruction algorithm.**
//!
//! Key characteristics:
//! - Compatible triplets are precomputed per module-group pair, so seeding
//!   and forwarding are pair lookups
//! - Module groups are walked from the far end of the detector inwards
//! - Tracks survive one missed module and are recovered by a direct scan
//!   of the raw modules
//! - Hits of long tracks are flagged to suppress clones; short (weak)
//!   tracks are only kept if no other track claimed their hits
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::collections::HashSet;
use std::mem;
use std::time::Instant;

use log::debug;
use velotrack_core::reconstruction::{ReconstructionStatistics, TrackReconstruction};
use velotrack_core::{Error, Event, Hit, HitId, Module, Result, Track, TrackingConfig};

use crate::compatibility::forward_scatter;
use crate::flagged::{FlaggedHits, TrackId};
use crate::merge::{group_pairs, merge_modules, recovery_module};
use crate::triplets::{GroupTriplets, TripletTrie};

/// Triplet-trie track following.
#[derive(Clone, Debug)]
pub struct TripletTrieSearch {
    config: TrackingConfig,
}

impl TripletTrieSearch {
    /// Creates the engine after validating `config`.
    pub fn new(config: TrackingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Merges the event's modules, checking there is at least one group pair.
    fn module_groups(&self, event: &Event) -> Result<Vec<Module>> {
        let offset = self.config.forward_offset;
        let modules = event.modules().len();
        if modules <= offset {
            return Err(Error::config(format!(
                "event has {modules} modules but forward_offset {offset} needs at least {}",
                offset.saturating_add(1)
            )));
        }
        let groups = merge_modules(event.modules(), self.config.merge_factor)?;
        if groups.len() <= offset {
            return Err(Error::config(format!(
                "{modules} modules merged by {} give {} groups, forward_offset {offset} needs {}",
                self.config.merge_factor,
                groups.len(),
                offset.saturating_add(1)
            )));
        }
        Ok(groups)
    }
}

impl Default for TripletTrieSearch {
    fn default() -> Self {
        Self {
            config: TrackingConfig::triplet_trie_defaults(),
        }
    }
}

impl TrackReconstruction for TripletTrieSearch {
    fn reconstruct_with_statistics(
        &self,
        event: &Event,
    ) -> Result<(Vec<Track>, ReconstructionStatistics)> {
        let start = Instant::now();
        let mut stats = ReconstructionStatistics {
            modules: event.modules().len(),
            hits: event.number_of_hits(),
            ..Default::default()
        };
        if event.is_empty() {
            return Ok((Vec::new(), stats));
        }

        let groups = self.module_groups(event)?;
        stats.module_groups = groups.len();

        let trie = TripletTrie::build(
            event,
            &groups,
            self.config.forward_offset,
            self.config.max_scatter,
        )?;
        stats.triplets = trie.len();

        let mut state = SearchState::new(&self.config, stats);
        for (m0, m1) in group_pairs(&groups, self.config.forward_offset) {
            let recovery = event.hits_in(recovery_module(event, m1)?);
            let triplets = trie.group(m0.number);

            state.forward(triplets, recovery);
            state.seed(triplets);
        }
        let (tracks, stats) = state.finish();

        debug!(
            "{}: {} groups, {} triplets, {} seeds -> {} strong, {} weak, {} discarded in {:.2?}",
            self.name(),
            stats.module_groups,
            stats.triplets,
            stats.seeds,
            stats.strong_tracks,
            stats.weak_tracks_accepted,
            stats.tracks_discarded,
            start.elapsed()
        );
        Ok((tracks, stats))
    }

    fn name(&self) -> &'static str {
        "TripletTrie"
    }
}

/// A track being followed.
#[derive(Debug)]
struct Candidate {
    id: TrackId,
    track: Track,
}

/// A seed offered by one first hit.
struct SeedProposal {
    hits: [Hit; 3],
    scatter: f64,
}

/// Working state of one event's reconstruction.
struct SearchState<'a> {
    config: &'a TrackingConfig,
    flagged: FlaggedHits,
    forwarding: Vec<Candidate>,
    weak: Vec<Candidate>,
    tracks: Vec<Track>,
    next_id: usize,
    stats: ReconstructionStatistics,
}

impl<'a> SearchState<'a> {
    fn new(config: &'a TrackingConfig, stats: ReconstructionStatistics) -> Self {
        Self {
            config,
            flagged: FlaggedHits::new(),
            forwarding: Vec::new(),
            weak: Vec::new(),
            tracks: Vec::new(),
            next_id: 0,
            stats,
        }
    }

    /// Extends every in-flight track by at most one hit.
    ///
    /// Tracks with a recent miss are recovered by scanning the `recovery`
    /// hits; the others only follow the triplet index.
    fn forward(&mut self, triplets: Option<&GroupTriplets>, recovery: &[Hit]) {
        for mut candidate in mem::take(&mut self.forwarding) {
            let Some((h0, h1)) = candidate.track.last_two() else {
                self.stats.tracks_discarded += 1;
                continue;
            };

            let next = if candidate.track.missed_recently() {
                let found = self.recover(&h0, &h1, recovery);
                if found.is_some() {
                    self.stats.recoveries += 1;
                }
                found
            } else {
                let found = triplets
                    .and_then(|t| t.get(h0.id, h1.id))
                    .map(|triplet| triplet.third)
                    .filter(|hit| !self.flagged.is_claimed_by_other(hit.id, candidate.id));
                if found.is_some() {
                    self.stats.extensions += 1;
                }
                found
            };

            match next {
                Some(hit) => {
                    self.extend(&mut candidate, hit);
                    self.forwarding.push(candidate);
                }
                None => {
                    if candidate.track.record_miss() {
                        self.terminate(candidate);
                    } else {
                        self.forwarding.push(candidate);
                    }
                }
            }
        }
    }

    /// Best unflagged continuation of `(h0, h1)` among the recovery hits.
    fn recover(&self, h0: &Hit, h1: &Hit, recovery: &[Hit]) -> Option<Hit> {
        let mut best = None;
        let mut best_scatter = self.config.max_scatter;
        for h2 in recovery {
            if self.flagged.is_flagged(h2.id) {
                continue;
            }
            if let Some(scatter) = forward_scatter(h0, h1, h2) {
                if scatter < best_scatter {
                    best = Some(*h2);
                    best_scatter = scatter;
                }
            }
        }
        best
    }

    /// Appends `hit` and flags what the track now claims.
    fn extend(&mut self, candidate: &mut Candidate, hit: Hit) {
        candidate.track.push(hit);
        candidate.track.record_extension();
        self.flagged.flag(hit.id, candidate.id);
        if candidate.track.len() >= self.config.min_hits_for_flag {
            self.flagged
                .flag_all(candidate.track.iter().map(|h| h.id), candidate.id);
        }
    }

    /// Starts new tracks from the triplets of the current group pair.
    ///
    /// Every unflagged first hit proposes its lowest-scatter unflagged
    /// triplet. Proposals sharing a hit are resolved in favour of the lower
    /// scatter (the earlier proposal on ties); survivors start in scan order.
    fn seed(&mut self, triplets: Option<&GroupTriplets>) {
        let Some(triplets) = triplets else {
            return;
        };

        let mut proposals = Vec::new();
        for entry in triplets.iter() {
            let h0 = *entry.first();
            if self.flagged.is_flagged(h0.id) {
                continue;
            }
            let mut best = None;
            let mut best_scatter = self.config.max_scatter;
            for triplet in entry.iter() {
                if !self.flagged.is_flagged(triplet.second.id)
                    && !self.flagged.is_flagged(triplet.third.id)
                    && triplet.scatter < best_scatter
                {
                    best = Some(triplet);
                    best_scatter = triplet.scatter;
                }
            }
            if let Some(triplet) = best {
                proposals.push(SeedProposal {
                    hits: [h0, triplet.second, triplet.third],
                    scatter: triplet.scatter,
                });
            }
        }

        let mut order: Vec<usize> = (0..proposals.len()).collect();
        order.sort_by(|&a, &b| proposals[a].scatter.total_cmp(&proposals[b].scatter));

        let mut taken: HashSet<HitId> = HashSet::new();
        let mut accepted = vec![false; proposals.len()];
        for index in order {
            let hits = &proposals[index].hits;
            if hits.iter().any(|hit| taken.contains(&hit.id)) {
                continue;
            }
            taken.extend(hits.iter().map(|hit| hit.id));
            accepted[index] = true;
        }

        for (proposal, _) in proposals
            .into_iter()
            .zip(accepted)
            .filter(|(_, accepted)| *accepted)
        {
            let id = TrackId(self.next_id);
            self.next_id += 1;
            self.stats.seeds += 1;
            self.forwarding.push(Candidate {
                id,
                track: Track::new(proposal.hits.to_vec()),
            });
        }
    }

    /// Classifies a finished track as strong, weak or discarded.
    fn terminate(&mut self, candidate: Candidate) {
        let length = candidate.track.len();
        let exclusive = candidate
            .track
            .iter()
            .all(|hit| !self.flagged.is_claimed_by_other(hit.id, candidate.id));

        if length >= self.config.min_strong_track_length && exclusive {
            self.flagged
                .flag_all(candidate.track.iter().map(|h| h.id), candidate.id);
            self.stats.strong_tracks += 1;
            self.tracks.push(candidate.track);
        } else if length >= self.config.min_weak_track_length {
            self.weak.push(candidate);
        } else {
            self.stats.tracks_discarded += 1;
        }
    }

    /// Classifies what is still in flight and reconciles the weak tracks.
    fn finish(mut self) -> (Vec<Track>, ReconstructionStatistics) {
        for candidate in mem::take(&mut self.forwarding) {
            self.terminate(candidate);
        }

        for candidate in mem::take(&mut self.weak) {
            let unclaimed = candidate
                .track
                .iter()
                .all(|hit| !self.flagged.is_claimed_by_other(hit.id, candidate.id));
            if unclaimed {
                self.flagged
                    .flag_all(candidate.track.iter().map(|h| h.id), candidate.id);
                self.stats.weak_tracks_accepted += 1;
                self.tracks.push(candidate.track);
            } else {
                self.stats.tracks_discarded += 1;
            }
        }

        (self.tracks, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrackingConfig {
        TrackingConfig::new()
            .with_merge_factor(1)
            .with_forward_offset(1)
            .with_max_scatter(0.01)
    }

    /// One module per entry of `layout`; each entry lists the x of its hits.
    /// Module `m` sits at z = m, hit y = 0, ids in order of appearance.
    fn event(layout: &[&[f64]]) -> Event {
        let mut id = 0;
        Event::from_modules(layout.iter().enumerate().map(|(m, xs)| {
            let z = m as f64;
            let hits = xs
                .iter()
                .map(|&x| {
                    id += 1;
                    Hit::new(id - 1, x, 0.0, z)
                })
                .collect();
            (z, hits)
        }))
        .unwrap()
    }

    #[test]
    fn test_new_validates_config() {
        assert!(TripletTrieSearch::new(config().with_merge_factor(0)).is_err());
        assert!(TripletTrieSearch::new(config()).is_ok());
        assert_eq!(TripletTrieSearch::default().name(), "TripletTrie");
    }

    #[test]
    fn test_follows_straight_track() {
        let event = event(&[&[0.0], &[1.0], &[2.0], &[3.0], &[4.0], &[5.0]]);
        let search = TripletTrieSearch::new(config()).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hit_ids(), vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(stats.seeds, 1);
        assert_eq!(stats.extensions, 3);
        assert_eq!(stats.strong_tracks, 1);
    }

    #[test]
    fn test_recovers_after_missed_module() {
        // Module 2 is empty: the trie cannot bridge it, the recovery scan does.
        let event = event(&[&[0.0], &[1.0], &[], &[3.0], &[4.0], &[5.0]]);
        let search = TripletTrieSearch::new(config()).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hit_ids(), vec![4, 3, 2, 1, 0]);
        assert_eq!(stats.recoveries, 2);
        assert!(tracks[0].missed_last_module);
    }

    #[test]
    fn test_two_misses_terminate_as_weak() {
        // Only three aligned hits; the rest of the detector is noise.
        let event = event(&[&[-7.0], &[9.0], &[2.0], &[3.0], &[4.0]]);
        let search = TripletTrieSearch::new(config()).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hit_ids(), vec![4, 3, 2]);
        assert_eq!(stats.strong_tracks, 0);
        assert_eq!(stats.weak_tracks_accepted, 1);
    }

    #[test]
    fn test_short_tracks_below_weak_length_are_dropped() {
        let event = event(&[&[-7.0], &[9.0], &[2.0], &[3.0], &[4.0]]);
        let search = TripletTrieSearch::new(config().with_min_weak_track_length(4)).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();
        assert!(tracks.is_empty());
        assert_eq!(stats.tracks_discarded, 1);
    }

    #[test]
    fn test_empty_event_returns_no_tracks() {
        let search = TripletTrieSearch::new(config()).unwrap();
        let no_hits = event(&[&[], &[], &[]]);
        assert!(search.reconstruct(&no_hits).unwrap().is_empty());
        assert!(search.reconstruct(&Event::default()).unwrap().is_empty());
    }

    #[test]
    fn test_too_few_groups_is_a_config_error() {
        // Three modules merged by two leave a single group.
        let event = event(&[&[0.0], &[1.0], &[2.0]]);
        let search = TripletTrieSearch::new(config().with_merge_factor(2)).unwrap();
        assert!(matches!(
            search.reconstruct(&event),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_huge_forward_offset_is_a_config_error() {
        let event = event(&[&[0.0], &[1.0], &[2.0], &[3.0], &[4.0], &[5.0]]);
        let search = TripletTrieSearch::new(config().with_forward_offset(usize::MAX)).unwrap();
        assert!(matches!(
            search.reconstruct(&event),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_merged_recovery_scans_raw_module_below_group_number() {
        // Twelve modules in six groups of two. After the miss at group pair
        // (4, 3) the recovery at pair (3, 2) scans raw module 1, not group 1.
        let event = event(&[
            &[],
            &[1.0],
            &[],
            &[],
            &[],
            &[],
            &[],
            &[7.0],
            &[],
            &[9.0],
            &[],
            &[11.0],
        ]);
        let search = TripletTrieSearch::new(config().with_merge_factor(2)).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hit_ids(), vec![3, 2, 1, 0]);
        assert_eq!(stats.recoveries, 1);
        assert_eq!(stats.strong_tracks, 1);
    }

    #[test]
    fn test_claimed_trie_continuation_counts_as_miss() {
        // Track A runs along x = z, track B along x = 2z - 1; both continue
        // to the single hit of module 1. A is followed first and keeps it.
        let event = event(&[
            &[0.0],
            &[1.0],
            &[2.0, 3.0],
            &[3.0, 5.0],
            &[4.0, 7.0],
            &[5.0, 9.0],
        ]);
        let search = TripletTrieSearch::new(config()).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].hit_ids(), vec![9, 7, 5, 3]);
        assert_eq!(tracks[1].hit_ids(), vec![8, 6, 4, 2, 1, 0]);
        assert_eq!(stats.strong_tracks, 2);
        assert_eq!(stats.recoveries, 0);
    }

    #[test]
    fn test_recovery_skips_flagged_hits() {
        // Track B (x = 2z - 1) misses module 2 and would recover through the
        // module 1 hit, but track A has already flagged it.
        let event = event(&[
            &[0.0],
            &[1.0],
            &[2.0],
            &[3.0, 5.0],
            &[4.0, 7.0],
            &[5.0, 9.0],
        ]);
        let search = TripletTrieSearch::new(config()).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].hit_ids(), vec![7, 5, 3, 2, 1, 0]);
        assert_eq!(tracks[1].hit_ids(), vec![8, 6, 4]);
        assert_eq!(stats.recoveries, 0);
        assert_eq!(stats.strong_tracks, 1);
        assert_eq!(stats.weak_tracks_accepted, 1);
    }

    #[test]
    fn test_long_track_sharing_a_claimed_hit_is_discarded() {
        // Track B (x = 2z - 5) is seeded through the module 5 hit of track A
        // (x = z) while A is still too short to flag it. A terminates first
        // and claims the hit, so B is demoted and then dropped.
        let event = event(&[
            &[0.0, -5.0],
            &[1.0, -3.0],
            &[2.0, -1.0],
            &[3.0, 1.0],
            &[4.0, 3.0],
            &[5.0],
            &[6.0, 7.0],
            &[7.0],
        ]);
        let search = TripletTrieSearch::new(config().with_min_hits_for_flag(10)).unwrap();
        let (tracks, stats) = search.reconstruct_with_statistics(&event).unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].hit_ids(), vec![13, 11, 10, 8, 6, 4, 2, 0]);
        assert_eq!(stats.seeds, 2);
        assert_eq!(stats.strong_tracks, 1);
        assert_eq!(stats.weak_tracks_accepted, 0);
        assert_eq!(stats.tracks_discarded, 1);
    }
}
