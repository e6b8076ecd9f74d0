//! Classical track following.
//!
//! Seeds are formed from hit pairs two modules apart (the detector halves
//! interleave), a third hit is searched in the next three modules, and the
//! track is then followed module by module until three consecutive modules
//! give no compatible hit. Hits of strong tracks are marked used as soon as
//! the track is found; used hits can no longer seed a track but may still
//! be picked up while following one.

use std::time::Instant;

use log::debug;
use velotrack_core::reconstruction::{ReconstructionStatistics, TrackReconstruction};
use velotrack_core::{Event, Hit, Module, Result, Track, TrackingConfig};

use crate::compatibility::ToleranceWindow;
use crate::flagged::{FlaggedHits, TrackId};

/// Consecutive modules without a compatible hit that end a track.
pub const MAX_MISSED_MODULES: usize = 3;

/// Classical module-by-module track follower.
#[derive(Clone, Debug)]
pub struct TrackFollowing {
    config: TrackingConfig,
    window: ToleranceWindow,
}

impl TrackFollowing {
    /// Creates the engine after validating `config`.
    ///
    /// # Errors
    /// [`velotrack_core::Error::ConfigError`] for an invalid configuration.
    pub fn new(config: TrackingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: TrackingConfig) -> Self {
        let window = ToleranceWindow {
            max_slopes: config.max_slopes,
            max_tolerance: config.max_tolerance,
            max_scatter: config.max_scatter,
        };
        Self { config, window }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// First hit of `module` in tolerance with the line `(h0, h1)`, used or not.
    fn find_in_module(&self, event: &Event, module: &Module, h0: &Hit, h1: &Hit) -> Option<Hit> {
        event
            .hits_in(module)
            .iter()
            .find(|h2| self.window.accepts(h0, h1, h2))
            .copied()
    }

    /// Completes the seed `(h0, h1)` with a third hit from modules `start`
    /// down to `start - 2`, then follows it towards module 0.
    fn follow(
        &self,
        event: &Event,
        seed: (&Hit, &Hit),
        start: usize,
        stats: &mut ReconstructionStatistics,
    ) -> Option<Track> {
        let (h0, h1) = seed;
        let modules = event.modules();

        let (mut index, h2) = (0..=start).rev().take(3).find_map(|index| {
            self.find_in_module(event, &modules[index], h0, h1)
                .map(|hit| (index, hit))
        })?;
        let mut track = Track::new(vec![*h0, *h1, h2]);

        let mut missed = 0;
        while index > 0 && missed < MAX_MISSED_MODULES {
            index -= 1;
            let (last_but_one, last) = track.last_two()?;
            match self.find_in_module(event, &modules[index], &last_but_one, &last) {
                Some(hit) => {
                    track.push(hit);
                    track.record_extension();
                    stats.extensions += 1;
                    missed = 0;
                }
                None => {
                    track.record_miss();
                    missed += 1;
                }
            }
        }
        Some(track)
    }
}

impl Default for TrackFollowing {
    fn default() -> Self {
        Self::with_valid_config(TrackingConfig::track_following_defaults())
    }
}

impl TrackReconstruction for TrackFollowing {
    fn reconstruct_with_statistics(
        &self,
        event: &Event,
    ) -> Result<(Vec<Track>, ReconstructionStatistics)> {
        let start_time = Instant::now();
        let modules = event.modules();
        let mut stats = ReconstructionStatistics {
            modules: modules.len(),
            module_groups: modules.len(),
            hits: event.number_of_hits(),
            ..Default::default()
        };
        if event.is_empty() || modules.len() < 4 {
            return Ok((Vec::new(), stats));
        }

        let mut used = FlaggedHits::new();
        let mut tracks = Vec::new();
        let mut weak_tracks = Vec::new();
        let mut next_id = 0;

        for start in (0..modules.len() - 3).rev() {
            for h0 in event.hits_in(&modules[start + 3]) {
                if used.is_flagged(h0.id) {
                    continue;
                }
                for h1 in event.hits_in(&modules[start + 1]) {
                    if used.is_flagged(h1.id) || !self.window.are_compatible(h0, h1) {
                        continue;
                    }
                    let Some(track) = self.follow(event, (h0, h1), start, &mut stats) else {
                        continue;
                    };
                    stats.seeds += 1;

                    if track.len() >= self.config.min_strong_track_length {
                        used.flag_all(track.iter().map(|h| h.id), TrackId(next_id));
                        next_id += 1;
                        stats.strong_tracks += 1;
                        tracks.push(track);
                        break;
                    } else if track.len() >= self.config.min_weak_track_length {
                        weak_tracks.push(track);
                    } else {
                        stats.tracks_discarded += 1;
                    }
                }
            }
        }

        for track in weak_tracks {
            if track.iter().any(|h| used.is_flagged(h.id)) {
                stats.tracks_discarded += 1;
                continue;
            }
            used.flag_all(track.iter().map(|h| h.id), TrackId(next_id));
            next_id += 1;
            stats.weak_tracks_accepted += 1;
            tracks.push(track);
        }

        debug!(
            "{}: {} modules, {} seeds -> {} strong, {} weak, {} discarded in {:.2?}",
            self.name(),
            stats.modules,
            stats.seeds,
            stats.strong_tracks,
            stats.weak_tracks_accepted,
            stats.tracks_discarded,
            start_time.elapsed()
        );
        Ok((tracks, stats))
    }

    fn name(&self) -> &'static str {
        "TrackFollowing"
    }
}
