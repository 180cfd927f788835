//! Numeric tolerance policy shared by every geometric predicate.
//!
//! Tolerances are configured as values RELATIVE to the extent of the input
//! points and resolved once per computation into absolute values with
//! [`Tolerance::resolve`]. The resulting [`ScaledTolerance`] is passed
//! through hull construction, the feasibility LP and vertex deduplication.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default relative tolerance for all predicates.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Absolute tolerances never drop below this many ulps of the largest
/// coordinate.
const ROUNDING_ULPS: f64 = 64.0;

/// Relative numeric tolerances.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Minimum inscribed-ball radius for an intersection to count as having
    /// an interior.
    pub interior_margin: f64,
    /// Two vertices closer than this are the same vertex.
    pub vertex_merge: f64,
    /// Points closer than this to a hyperplane lie on it.
    pub coplanarity: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::uniform(DEFAULT_TOLERANCE)
    }
}

impl Tolerance {
    /// Use the same relative tolerance for every predicate.
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            interior_margin: value,
            vertex_merge: value,
            coplanarity: value,
        }
    }

    #[must_use]
    pub const fn with_interior_margin(mut self, value: f64) -> Self {
        self.interior_margin = value;
        self
    }

    #[must_use]
    pub const fn with_vertex_merge(mut self, value: f64) -> Self {
        self.vertex_merge = value;
        self
    }

    #[must_use]
    pub const fn with_coplanarity(mut self, value: f64) -> Self {
        self.coplanarity = value;
        self
    }

    /// Reject non-finite or non-positive tolerances.
    ///
    /// # Errors
    /// [`ConfigError::InvalidTolerance`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("interior_margin", self.interior_margin),
            ("vertex_merge", self.vertex_merge),
            ("coplanarity", self.coplanarity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        Ok(())
    }

    /// Resolve into absolute tolerances for coordinates spread over `scale`.
    ///
    /// A zero or non-finite scale falls back to 1 so that all-zero inputs
    /// still get a usable tolerance.
    #[must_use]
    pub fn at_scale(&self, scale: f64) -> ScaledTolerance {
        self.resolve(&CoordinateScale {
            extent: scale,
            magnitude: 0.0,
        })
    }

    /// Resolve for a point set: proportional to its extent, but never below
    /// the rounding error of its largest coordinate.
    #[must_use]
    pub fn resolve(&self, coordinates: &CoordinateScale) -> ScaledTolerance {
        let scale = coordinates.reference();
        let floor = coordinates.rounding_floor();
        let absolute = |relative: f64| (relative * scale).max(floor);
        ScaledTolerance {
            scale,
            relative: *self,
            interior_margin: absolute(self.interior_margin),
            vertex_merge: absolute(self.vertex_merge),
            coplanarity: absolute(self.coplanarity),
        }
    }
}

/// Absolute tolerances for one computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledTolerance {
    /// Length the relative values were multiplied by.
    pub scale: f64,
    /// The relative policy this was resolved from.
    pub relative: Tolerance,
    pub interior_margin: f64,
    pub vertex_merge: f64,
    pub coplanarity: f64,
}

impl ScaledTolerance {
    /// Same relative policy, resolved for a different point set.
    #[must_use]
    pub fn rescaled(&self, coordinates: &CoordinateScale) -> Self {
        self.relative.resolve(coordinates)
    }
}

impl Default for ScaledTolerance {
    fn default() -> Self {
        Tolerance::default().at_scale(1.0)
    }
}

/// How far a point set spreads and how far it sits from the origin.
///
/// Tolerances follow the spread, so translating the input leaves them
/// unchanged until coordinate rounding catches up with them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoordinateScale {
    /// Largest per-axis spread `max − min`.
    pub extent: f64,
    /// Largest absolute coordinate.
    pub magnitude: f64,
}

impl CoordinateScale {
    /// Measure a point set. Axes beyond the first point's dimension are
    /// ignored.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a [f64]>) -> Self {
        let mut bounds: Vec<(f64, f64)> = Vec::new();
        let mut magnitude = 0.0_f64;
        for p in points {
            if bounds.is_empty() {
                bounds = p.iter().map(|&c| (c, c)).collect();
            }
            for ((lo, hi), &c) in bounds.iter_mut().zip(p) {
                *lo = lo.min(c);
                *hi = hi.max(c);
                magnitude = magnitude.max(c.abs());
            }
        }
        let extent = bounds.iter().map(|(lo, hi)| hi - lo).fold(0.0, f64::max);
        Self { extent, magnitude }
    }

    /// The length relative tolerances are multiplied by.
    #[must_use]
    pub fn reference(&self) -> f64 {
        [self.extent, self.magnitude]
            .into_iter()
            .find(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(1.0)
    }

    /// Smallest meaningful absolute tolerance at this magnitude.
    #[must_use]
    pub fn rounding_floor(&self) -> f64 {
        if self.magnitude.is_finite() {
            ROUNDING_ULPS * f64::EPSILON * self.magnitude
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_uniform() {
        let tol = Tolerance::default();
        assert_eq!(tol, Tolerance::uniform(DEFAULT_TOLERANCE));
        assert!(tol.validate().is_ok());
    }

    #[test]
    fn test_at_scale_multiplies() {
        let scaled = Tolerance::uniform(1e-9).at_scale(1000.0);
        assert!((scaled.coplanarity - 1e-6).abs() < 1e-18);
        assert!((scaled.vertex_merge - 1e-6).abs() < 1e-18);
        assert!((scaled.interior_margin - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn test_zero_scale_falls_back_to_one() {
        let scaled = Tolerance::default().at_scale(0.0);
        assert!((scaled.scale - 1.0).abs() < f64::EPSILON);
        let scaled = Tolerance::default().at_scale(f64::NAN);
        assert!((scaled.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rescaled_keeps_policy() {
        let tol = Tolerance::default().with_vertex_merge(1e-6);
        let scaled = tol.at_scale(2.0).rescaled(&CoordinateScale {
            extent: 10.0,
            magnitude: 5.0,
        });
        assert_eq!(scaled.relative, tol);
        assert!((scaled.vertex_merge - 1e-5).abs() < 1e-18);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = Tolerance::default().with_coplanarity(0.0).validate();
        assert_eq!(
            err,
            Err(ConfigError::InvalidTolerance {
                name: "coplanarity",
                value: 0.0
            })
        );
        assert!(
            Tolerance::default()
                .with_interior_margin(f64::INFINITY)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_coordinate_scale() {
        let points = [vec![1.0, -3.5], vec![2.0, 0.5]];
        let scale = CoordinateScale::of_points(points.iter().map(Vec::as_slice));
        assert!((scale.extent - 4.0).abs() < f64::EPSILON);
        assert!((scale.magnitude - 3.5).abs() < f64::EPSILON);
        assert!((scale.reference() - 4.0).abs() < f64::EPSILON);

        let single = CoordinateScale::of_points([[7.0, -2.0].as_slice()]);
        assert!((single.reference() - 7.0).abs() < f64::EPSILON);
        assert!((CoordinateScale::default().reference() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_follows_extent_not_position() {
        let tol = Tolerance::default();
        let near: Vec<[f64; 2]> = vec![[0.0, 0.0], [2.0, 1.0]];
        let far: Vec<[f64; 2]> = near.iter().map(|p| [p[0] + 1e3, p[1] - 1e3]).collect();

        let near = tol.resolve(&CoordinateScale::of_points(near.iter().map(|p| p.as_slice())));
        let far = tol.resolve(&CoordinateScale::of_points(far.iter().map(|p| p.as_slice())));
        assert!((near.coplanarity - 2e-9).abs() < 1e-20);
        assert!((far.coplanarity - near.coplanarity).abs() < 1e-20);
        assert!((far.interior_margin - near.interior_margin).abs() < 1e-20);
    }

    #[test]
    fn test_resolve_respects_rounding_floor() {
        let scale = CoordinateScale {
            extent: 1.0,
            magnitude: 1e9,
        };
        let scaled = Tolerance::default().resolve(&scale);
        assert!((scaled.coplanarity - ROUNDING_ULPS * f64::EPSILON * 1e9).abs() < 1e-18);
        assert!(scaled.coplanarity > 1e-9);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let tol: Tolerance = serde_json::from_str(r#"{ "vertex_merge": 1e-6 }"#).unwrap();
        assert!((tol.vertex_merge - 1e-6).abs() < 1e-18);
        assert!((tol.coplanarity - DEFAULT_TOLERANCE).abs() < 1e-18);
    }
}
