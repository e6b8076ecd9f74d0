//! velotrack-algorithms: Track following algorithms for vertex detector events.
//!
//! This crate provides two reconstruction engines:
//! - **`TripletTrie`** - precomputed triplet index over merged modules, primary
//! - **`TrackFollowing`** - classical module-by-module follower
//!
//! Both consume an [`Event`] and return tracks ordered from the far end of
//! the detector inwards.
//!
#![warn(missing_docs)]

pub mod compatibility;
pub mod flagged;
pub mod merge;
mod processing;
mod track_following;
mod triplet_trie;
pub mod triplets;

pub use compatibility::ToleranceWindow;
pub use flagged::{FlaggedHits, TrackId};
pub use processing::{
    reconstruct, reconstruct_batch, reconstruct_with_statistics, TrackingAlgorithm,
};
pub use track_following::{TrackFollowing, MAX_MISSED_MODULES};
pub use triplet_trie::TripletTrieSearch;
pub use triplets::TripletTrie;

// Re-export core reconstruction types
pub use velotrack_core::reconstruction::{ReconstructionStatistics, TrackReconstruction};
pub use velotrack_core::{Event, Track, TrackingConfig};
