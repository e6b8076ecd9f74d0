//! Error types for velotrack-core.

use crate::hit::HitId;
use thiserror::Error;

/// Result type alias for velotrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for track reconstruction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid reconstruction parameters, or an event the parameters cannot be applied to.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Two hits used to build a straight line share a z coordinate.
    #[error("degenerate geometry: hits {first} and {second} share z = {z}")]
    DegenerateGeometry {
        /// Hit the line starts from.
        first: HitId,
        /// Hit at the same z.
        second: HitId,
        /// The shared z coordinate.
        z: f64,
    },

    /// Event layout is inconsistent (prefix sums, module count).
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// The same hit id appears twice in one event.
    #[error("duplicate hit id: {0}")]
    DuplicateHitId(HitId),
}

impl Error {
    /// Shorthand for [`Error::ConfigError`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
