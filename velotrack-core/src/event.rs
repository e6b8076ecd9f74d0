//! Collision events: the hits of one bunch crossing, grouped by module.
#![allow(clippy::missing_errors_doc)]

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::hit::Hit;
use crate::module::Module;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An event in prefix-sum layout: one flat hit array, with every module
/// owning a contiguous range of it.
///
/// Modules are ordered by their sequence index, which follows z. Events are
/// immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    hits: Vec<Hit>,
    modules: Vec<Module>,
}

impl Event {
    /// Builds an event from a flat hit array and per-module layout.
    ///
    /// `module_prefix_sum` has one entry more than there are modules: module
    /// `m` owns `hits[prefix[m]..prefix[m + 1]]`. Hits are tagged with the
    /// module they fall in.
    pub fn new(hits: Vec<Hit>, module_prefix_sum: &[usize], module_z: &[f64]) -> Result<Self> {
        let Some((&first, _)) = module_prefix_sum.split_first() else {
            return Err(Error::InvalidEvent(
                "module prefix sum must not be empty".to_string(),
            ));
        };
        if module_prefix_sum.len() != module_z.len() + 1 {
            return Err(Error::InvalidEvent(format!(
                "prefix sum has {} entries for {} modules",
                module_prefix_sum.len(),
                module_z.len()
            )));
        }
        if first != 0 {
            return Err(Error::InvalidEvent(format!(
                "prefix sum must start at 0, got {first}"
            )));
        }
        if let Some(window) = module_prefix_sum.windows(2).find(|w| w[1] < w[0]) {
            return Err(Error::InvalidEvent(format!(
                "prefix sum decreases from {} to {}",
                window[0], window[1]
            )));
        }
        let total = module_prefix_sum[module_prefix_sum.len() - 1];
        if total != hits.len() {
            return Err(Error::InvalidEvent(format!(
                "prefix sum covers {total} hits but event has {}",
                hits.len()
            )));
        }

        let mut seen = HashSet::with_capacity(hits.len());
        if let Some(dup) = hits.iter().find(|hit| !seen.insert(hit.id)) {
            return Err(Error::DuplicateHitId(dup.id));
        }

        let modules: Vec<Module> = module_z
            .iter()
            .enumerate()
            .map(|(number, &z)| {
                Module::new(
                    number,
                    z,
                    module_prefix_sum[number],
                    module_prefix_sum[number + 1],
                )
            })
            .collect();

        let mut hits = hits;
        for module in &modules {
            for hit in &mut hits[module.hit_range()] {
                *hit = hit.on_module(module.number);
            }
        }

        Ok(Self { hits, modules })
    }

    /// Builds an event from `(z, hits)` pairs, one per module, in detector order.
    pub fn from_modules<I>(modules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, Vec<Hit>)>,
    {
        let mut hits = Vec::new();
        let mut prefix = vec![0];
        let mut module_z = Vec::new();
        for (z, module_hits) in modules {
            hits.extend(module_hits);
            prefix.push(hits.len());
            module_z.push(z);
        }
        Self::new(hits, &prefix, &module_z)
    }

    /// All hits of the event, module by module.
    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Modules in detector order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Hits owned by a module (or module group) of this event.
    ///
    /// Ranges outside the event yield an empty slice.
    #[must_use]
    pub fn hits_in(&self, module: &Module) -> &[Hit] {
        self.hits.get(module.hit_range()).unwrap_or(&[])
    }

    /// Number of hits in the event.
    #[must_use]
    pub fn number_of_hits(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event has no modules or no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() || self.hits.is_empty()
    }
}
