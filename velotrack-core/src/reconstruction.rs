//! Track reconstruction traits and configuration.

use crate::error::Error;
use crate::{Event, Result, Track};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters recognised by the track reconstruction engines.
///
/// The triplet-trie engine reads the scatter, merging, offset and length
/// fields; the classical track follower additionally reads the per-axis
/// slopes and tolerances.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackingConfig {
    /// Upper bound (exclusive) on the scatter of an accepted third hit.
    #[cfg_attr(feature = "serde", serde(alias = "scatter"))]
    pub max_scatter: f64,
    /// Number of consecutive modules merged into one module group.
    pub merge_factor: usize,
    /// Distance, in module groups, between the two groups of a seeding pair.
    pub forward_offset: usize,
    /// Track length from which a track claims its hits.
    pub min_hits_for_flag: usize,
    /// Minimum length of a strong track.
    #[cfg_attr(
        feature = "serde",
        serde(alias = "min_hits_for_track", alias = "min_strong_length")
    )]
    pub min_strong_track_length: usize,
    /// Minimum length of any returned track.
    #[cfg_attr(feature = "serde", serde(alias = "min_track_length"))]
    pub min_weak_track_length: usize,
    /// Maximum |dx/dz| and |dy/dz| of a seeding pair (classical follower).
    pub max_slopes: (f64, f64),
    /// Maximum absolute x and y residual of a third hit (classical follower).
    pub max_tolerance: (f64, f64),
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_scatter: 0.1,
            merge_factor: 2,
            forward_offset: 1,
            min_hits_for_flag: 4,
            min_strong_track_length: 4,
            min_weak_track_length: 3,
            max_slopes: (0.7, 0.7),
            max_tolerance: (0.4, 0.4),
        }
    }
}

impl TrackingConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults tuned for the triplet-trie engine.
    #[must_use]
    pub fn triplet_trie_defaults() -> Self {
        Self::default()
    }

    /// Defaults tuned for the classical track follower.
    #[must_use]
    pub fn track_following_defaults() -> Self {
        Self {
            max_scatter: 0.4,
            ..Self::default()
        }
    }

    /// Sets the scatter bound.
    #[must_use]
    pub fn with_max_scatter(mut self, max_scatter: f64) -> Self {
        self.max_scatter = max_scatter;
        self
    }

    /// Sets the module merge factor.
    #[must_use]
    pub fn with_merge_factor(mut self, merge_factor: usize) -> Self {
        self.merge_factor = merge_factor;
        self
    }

    /// Sets the forward offset.
    #[must_use]
    pub fn with_forward_offset(mut self, forward_offset: usize) -> Self {
        self.forward_offset = forward_offset;
        self
    }

    /// Sets the flagging threshold.
    #[must_use]
    pub fn with_min_hits_for_flag(mut self, hits: usize) -> Self {
        self.min_hits_for_flag = hits;
        self
    }

    /// Sets the strong track length.
    #[must_use]
    pub fn with_min_strong_track_length(mut self, length: usize) -> Self {
        self.min_strong_track_length = length;
        self
    }

    /// Sets the weak track length.
    #[must_use]
    pub fn with_min_weak_track_length(mut self, length: usize) -> Self {
        self.min_weak_track_length = length;
        self
    }

    /// Sets the per-axis slope limits.
    #[must_use]
    pub fn with_max_slopes(mut self, x: f64, y: f64) -> Self {
        self.max_slopes = (x, y);
        self
    }

    /// Sets the per-axis residual tolerances.
    #[must_use]
    pub fn with_max_tolerance(mut self, x: f64, y: f64) -> Self {
        self.max_tolerance = (x, y);
        self
    }

    /// Checks that every parameter is usable.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.merge_factor == 0 {
            return Err(Error::config("merge_factor must be at least 1"));
        }
        if self.forward_offset == 0 {
            return Err(Error::config("forward_offset must be at least 1"));
        }
        check_positive("max_scatter", self.max_scatter)?;
        if self.min_hits_for_flag == 0 {
            return Err(Error::config("min_hits_for_flag must be positive"));
        }
        if self.min_strong_track_length == 0 {
            return Err(Error::config("min_strong_track_length must be positive"));
        }
        if self.min_weak_track_length == 0 {
            return Err(Error::config("min_weak_track_length must be positive"));
        }
        if self.min_weak_track_length > self.min_strong_track_length {
            return Err(Error::config(format!(
                "min_weak_track_length ({}) exceeds min_strong_track_length ({})",
                self.min_weak_track_length, self.min_strong_track_length
            )));
        }
        check_positive("max_slopes.x", self.max_slopes.0)?;
        check_positive("max_slopes.y", self.max_slopes.1)?;
        check_positive("max_tolerance.x", self.max_tolerance.0)?;
        check_positive("max_tolerance.y", self.max_tolerance.1)?;
        Ok(())
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

/// Counters collected while reconstructing one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionStatistics {
    /// Raw modules in the event.
    pub modules: usize,
    /// Module groups after merging.
    pub module_groups: usize,
    /// Hits in the event.
    pub hits: usize,
    /// Compatible triplets stored in the index.
    pub triplets: usize,
    /// Seeds started.
    pub seeds: usize,
    /// Extensions through the triplet index.
    pub extensions: usize,
    /// Extensions through a recovery scan.
    pub recoveries: usize,
    /// Strong tracks emitted.
    pub strong_tracks: usize,
    /// Weak tracks that survived reconciliation.
    pub weak_tracks_accepted: usize,
    /// Candidates dropped as too short, clones or ghosts.
    pub tracks_discarded: usize,
}

impl ReconstructionStatistics {
    /// Total number of returned tracks.
    #[must_use]
    pub fn tracks(&self) -> usize {
        self.strong_tracks + self.weak_tracks_accepted
    }
}

/// Trait for track reconstruction algorithms.
///
/// An implementation is a pure function of the event and its own
/// configuration: every call allocates its own working state, so one
/// instance can serve many events, also from several threads.
pub trait TrackReconstruction: Send + Sync {
    /// Reconstructs the tracks of one event, in discovery order.
    ///
    /// # Errors
    /// Fails when the configuration cannot be applied to the event.
    fn reconstruct(&self, event: &Event) -> Result<Vec<Track>> {
        self.reconstruct_with_statistics(event)
            .map(|(tracks, _)| tracks)
    }

    /// Reconstructs one event and reports what happened along the way.
    ///
    /// # Errors
    /// Fails when the configuration cannot be applied to the event.
    fn reconstruct_with_statistics(
        &self,
        event: &Event,
    ) -> Result<(Vec<Track>, ReconstructionStatistics)>;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tracking_config_builders() {
        let config = TrackingConfig::new()
            .with_max_scatter(0.25)
            .with_merge_factor(1)
            .with_forward_offset(2)
            .with_min_hits_for_flag(5)
            .with_min_strong_track_length(6)
            .with_min_weak_track_length(4)
            .with_max_slopes(0.5, 0.6)
            .with_max_tolerance(0.3, 0.2);

        assert_relative_eq!(config.max_scatter, 0.25);
        assert_eq!(config.merge_factor, 1);
        assert_eq!(config.forward_offset, 2);
        assert_eq!(config.min_hits_for_flag, 5);
        assert_eq!(config.min_strong_track_length, 6);
        assert_eq!(config.min_weak_track_length, 4);
        assert_eq!(config.max_slopes, (0.5, 0.6));
        assert_eq!(config.max_tolerance, (0.3, 0.2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(TrackingConfig::triplet_trie_defaults().validate().is_ok());
        let classical = TrackingConfig::track_following_defaults();
        assert!(classical.validate().is_ok());
        assert_relative_eq!(classical.max_scatter, 0.4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrackingConfig::new().with_merge_factor(0),
            TrackingConfig::new().with_forward_offset(0),
            TrackingConfig::new().with_max_scatter(0.0),
            TrackingConfig::new().with_max_scatter(-1.0),
            TrackingConfig::new().with_max_scatter(f64::NAN),
            TrackingConfig::new().with_min_hits_for_flag(0),
            TrackingConfig::new().with_min_strong_track_length(0),
            TrackingConfig::new().with_min_weak_track_length(0),
            TrackingConfig::new().with_min_weak_track_length(5),
            TrackingConfig::new().with_max_slopes(0.0, 0.7),
            TrackingConfig::new().with_max_tolerance(0.4, f64::INFINITY),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(Error::ConfigError(_))),
                "accepted {config:?}"
            );
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_from_parameter_map() {
        let config: TrackingConfig = serde_json::from_str(
            r#"{"scatter": 0.3, "min_hits_for_track": 5, "min_track_length": 3}"#,
        )
        .unwrap();
        assert_relative_eq!(config.max_scatter, 0.3);
        assert_eq!(config.min_strong_track_length, 5);
        assert_eq!(config.min_weak_track_length, 3);
        assert_eq!(config.merge_factor, 2);
    }

    #[test]
    fn test_statistics_total() {
        let stats = ReconstructionStatistics {
            strong_tracks: 3,
            weak_tracks_accepted: 2,
            ..Default::default()
        };
        assert_eq!(stats.tracks(), 5);
    }
}
