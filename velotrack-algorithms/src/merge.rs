//! Module merging.
//!
//! Consecutive raw modules are merged into coarser module groups, which the
//! triplet index and the track follower walk instead of the raw modules.

use velotrack_core::{Error, Event, Module, Result};

/// Merges consecutive modules into groups of exactly `merge_factor`.
///
/// Group `g` covers raw modules `g * merge_factor .. (g + 1) * merge_factor`.
/// It takes its number (`first.number / merge_factor`) and z from its first
/// member, and its hit range runs from the first member's start to the last
/// member's end. A trailing partial group is dropped, never padded.
///
/// # Errors
/// [`Error::ConfigError`] when `merge_factor` is 0.
pub fn merge_modules(modules: &[Module], merge_factor: usize) -> Result<Vec<Module>> {
    if merge_factor == 0 {
        return Err(Error::config("merge_factor must be at least 1"));
    }
    Ok(modules
        .chunks_exact(merge_factor)
        .map(|group| {
            let first = group[0];
            let last = group[group.len() - 1];
            Module::new(
                first.number / merge_factor,
                first.z,
                first.hit_start,
                last.hit_end,
            )
        })
        .collect())
}

/// Module group pairs `(m0, m1) = (groups[i + offset], groups[i])`, from the
/// far end of the detector inwards.
pub fn group_pairs(
    groups: &[Module],
    forward_offset: usize,
) -> impl Iterator<Item = (&Module, &Module)> {
    let split = groups.len().saturating_sub(forward_offset);
    groups
        .get(forward_offset..)
        .unwrap_or(&[])
        .iter()
        .rev()
        .zip(groups[..split].iter().rev())
}

/// The group the third hit of a `(m0, m1)` pair is drawn from.
///
/// This is the group immediately preceding `m1`. The first group has no
/// predecessor, so its own nearer planes are used instead.
///
/// # Errors
/// [`Error::ConfigError`] when the rule points outside `groups`.
pub fn third_hit_group<'a>(groups: &'a [Module], m1: &Module) -> Result<&'a Module> {
    let index = m1.number.saturating_sub(1);
    groups.get(index).ok_or_else(|| {
        Error::config(format!(
            "module group {} has no third-hit group {index} ({} groups)",
            m1.number,
            groups.len()
        ))
    })
}

/// The raw module scanned when recovering a track at a `(m0, m1)` step.
///
/// This is the raw module whose index is `m1`'s group number minus one (the
/// first raw module when `m1` is the first group). Group numbers are used as
/// raw indices here, so for `merge_factor > 1` this module usually lies well
/// inside the detector rather than in the third-hit group.
///
/// # Errors
/// [`Error::ConfigError`] when the event has no raw module at that index.
pub fn recovery_module<'a>(event: &'a Event, m1: &Module) -> Result<&'a Module> {
    let index = m1.number.saturating_sub(1);
    event.modules().get(index).ok_or_else(|| {
        Error::config(format!(
            "module group {} refers to raw module {index} but the event has {}",
            m1.number,
            event.modules().len()
        ))
    })
}
