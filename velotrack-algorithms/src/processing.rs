//! High-level helpers that pick an engine and run it over one or many events.

use rayon::prelude::*;
use velotrack_core::reconstruction::{ReconstructionStatistics, TrackReconstruction};
use velotrack_core::{Event, Result, Track, TrackingConfig};

use crate::{TrackFollowing, TripletTrieSearch};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Available reconstruction engines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrackingAlgorithm {
    /// Triplet-trie search with module merging and hit flagging.
    #[default]
    TripletTrie,
    /// Classical module-by-module track following.
    TrackFollowing,
}

impl TrackingAlgorithm {
    /// Builds the engine with `config`.
    ///
    /// # Errors
    /// [`velotrack_core::Error::ConfigError`] for an invalid configuration.
    pub fn engine(self, config: &TrackingConfig) -> Result<Box<dyn TrackReconstruction>> {
        Ok(match self {
            Self::TripletTrie => Box::new(TripletTrieSearch::new(config.clone())?),
            Self::TrackFollowing => Box::new(TrackFollowing::new(config.clone())?),
        })
    }
}

/// Reconstructs the tracks of one event.
///
/// # Errors
/// Configuration errors, and event shapes the engine cannot work with.
pub fn reconstruct(
    event: &Event,
    algorithm: TrackingAlgorithm,
    config: &TrackingConfig,
) -> Result<Vec<Track>> {
    algorithm.engine(config)?.reconstruct(event)
}

/// Like [`reconstruct`], also returning the run's statistics.
///
/// # Errors
/// Same as [`reconstruct`].
pub fn reconstruct_with_statistics(
    event: &Event,
    algorithm: TrackingAlgorithm,
    config: &TrackingConfig,
) -> Result<(Vec<Track>, ReconstructionStatistics)> {
    algorithm.engine(config)?.reconstruct_with_statistics(event)
}

/// Reconstructs independent events in parallel.
///
/// Results are in event order. The first failing event fails the batch.
///
/// # Errors
/// Same as [`reconstruct`].
pub fn reconstruct_batch(
    events: &[Event],
    algorithm: TrackingAlgorithm,
    config: &TrackingConfig,
) -> Result<Vec<Vec<Track>>> {
    let engine = algorithm.engine(config)?;
    let engine = engine.as_ref();
    events
        .par_iter()
        .map(|event| engine.reconstruct(event))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use velotrack_core::{Error, Hit};

    fn straight_event(offset: f64, first_id: u32) -> Event {
        Event::from_modules((0..6u32).map(|m| {
            let z = f64::from(m);
            (z, vec![Hit::new(first_id + m, offset + 0.1 * z, 0.0, z)])
        }))
        .unwrap()
    }

    #[test]
    fn test_batch_matches_single_runs() {
        let config = TrackingConfig::new().with_merge_factor(1);
        let events: Vec<Event> = (0..8)
            .map(|i| straight_event(f64::from(i), i * 10))
            .collect();

        let batch = reconstruct_batch(&events, TrackingAlgorithm::TripletTrie, &config).unwrap();
        assert_eq!(batch.len(), events.len());
        for (event, tracks) in events.iter().zip(&batch) {
            let single = reconstruct(event, TrackingAlgorithm::TripletTrie, &config).unwrap();
            assert_eq!(&single, tracks);
            assert_eq!(tracks.len(), 1);
        }
    }

    #[test]
    fn test_batch_stops_at_first_error() {
        let config = TrackingConfig::new().with_merge_factor(4);
        let events = vec![straight_event(0.0, 0)];
        assert!(matches!(
            reconstruct_batch(&events, TrackingAlgorithm::TripletTrie, &config),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_engines_by_name() {
        let config = TrackingConfig::track_following_defaults();
        let names: Vec<&str> = [TrackingAlgorithm::TripletTrie, TrackingAlgorithm::TrackFollowing]
            .into_iter()
            .map(|a| a.engine(&config).unwrap().name())
            .collect();
        assert_eq!(names, vec!["TripletTrie", "TrackFollowing"]);
        assert_eq!(TrackingAlgorithm::default(), TrackingAlgorithm::TripletTrie);

        let event = straight_event(0.0, 0);
        let (tracks, stats) =
            reconstruct_with_statistics(&event, TrackingAlgorithm::TrackFollowing, &config)
                .unwrap();
        assert_eq!(stats.tracks(), tracks.len());
    }
}
