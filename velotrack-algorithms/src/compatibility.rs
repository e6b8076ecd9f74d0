//! Straight-line compatibility of hit pairs and triplets.
//!
//! Every test extrapolates the line through two hits to the z of a third
//! hit and looks at the transverse residual. Lines through two hits on the
//! same plane are undefined; they surface as
//! [`Error::DegenerateGeometry`] and scans treat them as incompatible.

use velotrack_core::{Error, Hit, Result};

/// Transverse offset of a hit from the line through two earlier hits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Residual {
    /// Predicted minus measured x.
    pub dx: f64,
    /// Predicted minus measured y.
    pub dy: f64,
}

impl Residual {
    /// Squared transverse distance.
    #[inline]
    #[must_use]
    pub fn squared(&self) -> f64 {
        self.dx * self.dx + self.dy * self.dy
    }
}

/// Extrapolates the line through `h0` and `h1` to the z of `h2`.
///
/// # Errors
/// [`Error::DegenerateGeometry`] when `h0` and `h1` share a z coordinate.
#[inline]
pub fn residual(h0: &Hit, h1: &Hit, h2: &Hit) -> Result<Residual> {
    let dz01 = h1.z - h0.z;
    if dz01 == 0.0 {
        return Err(Error::DegenerateGeometry {
            first: h0.id,
            second: h1.id,
            z: h0.z,
        });
    }
    let td = 1.0 / dz01;
    let tx = (h1.x - h0.x) * td;
    let ty = (h1.y - h0.y) * td;

    let dz = h2.z - h0.z;
    Ok(Residual {
        dx: h0.x + tx * dz - h2.x,
        dy: h0.y + ty * dz - h2.y,
    })
}

/// Squared residual of `h2` against the line through `h0` and `h1`.
///
/// # Errors
/// [`Error::DegenerateGeometry`] when `h0` and `h1` share a z coordinate.
#[inline]
pub fn scatter(h0: &Hit, h1: &Hit, h2: &Hit) -> Result<f64> {
    residual(h0, h1, h2).map(|r| r.squared())
}

/// Checks that `h2` continues the direction of travel from `h0` to `h1`.
///
/// # Errors
/// [`Error::DegenerateGeometry`] when any two consecutive hits share a z
/// coordinate.
#[inline]
pub fn check_direction(h0: &Hit, h1: &Hit, h2: &Hit) -> Result<bool> {
    let dz01 = h1.z - h0.z;
    if dz01 == 0.0 {
        return Err(Error::DegenerateGeometry {
            first: h0.id,
            second: h1.id,
            z: h0.z,
        });
    }
    let dz12 = h2.z - h1.z;
    if dz12 == 0.0 {
        return Err(Error::DegenerateGeometry {
            first: h1.id,
            second: h2.id,
            z: h1.z,
        });
    }
    Ok(dz01.signum() == dz12.signum())
}

/// Scatter of a forward-ordered triplet, or `None` if the hits cannot form one.
///
/// This is the acceptance test used by the triplet-trie engine: degenerate
/// or backwards triplets are simply not candidates.
#[inline]
#[must_use]
pub fn forward_scatter(h0: &Hit, h1: &Hit, h2: &Hit) -> Option<f64> {
    match check_direction(h0, h1, h2) {
        Ok(true) => scatter(h0, h1, h2).ok(),
        _ => None,
    }
}

/// Slope and residual limits of the classical track follower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToleranceWindow {
    /// Maximum |dx/dz| and |dy/dz| between the two seeding hits.
    pub max_slopes: (f64, f64),
    /// Maximum absolute x and y residual.
    pub max_tolerance: (f64, f64),
    /// Maximum residual normalised by the extrapolation distance.
    pub max_scatter: f64,
}

impl ToleranceWindow {
    /// Returns true if the pair is within the slope limits in both axes.
    ///
    /// Hits on the same plane are never compatible.
    #[must_use]
    pub fn are_compatible(&self, h0: &Hit, h1: &Hit) -> bool {
        let hit_distance = (h1.z - h0.z).abs();
        let dx_max = self.max_slopes.0 * hit_distance;
        let dy_max = self.max_slopes.1 * hit_distance;
        (h1.x - h0.x).abs() < dx_max && (h1.y - h0.y).abs() < dy_max
    }

    /// Returns true if `h2` is within both absolute tolerances and its
    /// residual, normalised by `(h2.z - h1.z)^2`, is below the scatter bound.
    ///
    /// # Errors
    /// [`Error::DegenerateGeometry`] when `h0`/`h1` or `h1`/`h2` share a z.
    pub fn check_tolerance(&self, h0: &Hit, h1: &Hit, h2: &Hit) -> Result<bool> {
        let r = residual(h0, h1, h2)?;
        let dz21 = h2.z - h1.z;
        if dz21 == 0.0 {
            return Err(Error::DegenerateGeometry {
                first: h1.id,
                second: h2.id,
                z: h1.z,
            });
        }
        let denom = 1.0 / dz21;
        let normalised = r.squared() * denom * denom;
        Ok(r.dx.abs() < self.max_tolerance.0
            && r.dy.abs() < self.max_tolerance.1
            && normalised < self.max_scatter)
    }

    /// [`check_tolerance`](Self::check_tolerance) with degenerate input
    /// counted as a rejection.
    #[must_use]
    pub fn accepts(&self, h0: &Hit, h1: &Hit, h2: &Hit) -> bool {
        self.check_tolerance(h0, h1, h2).unwrap_or(false)
    }
}
