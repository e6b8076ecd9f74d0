//! Hit types for vertex detector data.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a hit, unique within one event.
pub type HitId = u32;

/// A single space point measured on a detector module.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Event-unique identity.
    pub id: HitId,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (along the beam axis).
    pub z: f64,
    /// Raw module the hit was recorded on, once attached to an event.
    #[cfg_attr(feature = "serde", serde(default))]
    pub module: Option<usize>,
}

impl Hit {
    /// Creates a hit that is not yet attached to a module.
    #[inline]
    #[must_use]
    pub fn new(id: HitId, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            x,
            y,
            z,
            module: None,
        }
    }

    /// Returns the same hit tagged with its raw module index.
    #[inline]
    #[must_use]
    pub fn on_module(mut self, module: usize) -> Self {
        self.module = Some(module);
        self
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.module {
            Some(module) => write!(
                f,
                "#{} module {} {{{}, {}, {}}}",
                self.id, module, self.x, self.y, self.z
            ),
            None => write!(f, "#{} {{{}, {}, {}}}", self.id, self.x, self.y, self.z),
        }
    }
}
