//! velotrack-core: Core types for vertex detector track reconstruction.
//!
//! This crate provides the event model (hits, modules, events, tracks), the
//! shared reconstruction configuration, and the trait every tracking
//! algorithm implements.
//!

pub mod error;
pub mod event;
pub mod hit;
pub mod module;
pub mod reconstruction;
pub mod track;

pub use error::{Error, Result};
pub use event::Event;
pub use hit::{Hit, HitId};
pub use module::Module;
pub use reconstruction::{ReconstructionStatistics, TrackReconstruction, TrackingConfig};
pub use track::Track;
