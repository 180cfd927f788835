//! # Separability Score
//!
//! Orchestrates the pipeline for one labeled point set:
//!
//! ```text
//! points + labels ─► partition ─► per-class hulls ─► stacked halfspaces
//!                                  (rayon)                │
//!     score = volume · (1 − f_k) ◄─ volume ◄─ vertices ◄─ inscribed-margin LP
//! ```
//!
//! Every stage may end the computation early with volume zero. Those
//! outcomes are successful, degenerate scores tagged with a
//! [`DegenerateReason`]; only invalid input and numerical failures are
//! errors.

use std::fmt;
use std::hash::Hash;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::halfspace::HRepresentation;
use crate::hull::{ConvexHullBuilder, HullDegeneracy, HullOutcome};
use crate::intersection::intersect;
use crate::lp::LpOptions;
use crate::partition::partition;
use crate::polytope::Polytope;
use crate::tolerance::Tolerance;

/// Why a score is zero without the full pipeline having run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegenerateReason {
    /// Only one class (N = 1), so there is nothing to intersect.
    SingleClass,
    /// Some class has fewer than N+1 points.
    InsufficientPoints,
    /// Some class's points span fewer than N dimensions.
    FlatHull,
    /// The hulls' intersection is empty or meets only on its boundary.
    EmptyInterior,
    /// Fewer than N+1 vertices were enumerated.
    InsufficientVertices,
}

impl DegenerateReason {
    /// The kebab-case tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleClass => "single-class",
            Self::InsufficientPoints => "insufficient-points",
            Self::FlatHull => "flat-hull",
            Self::EmptyInterior => "empty-interior",
            Self::InsufficientVertices => "insufficient-vertices",
        }
    }
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a score computation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// `volume · (1 − f_k)`, or `0` when degenerate.
    pub value: f64,
    /// N-volume of the intersection of all class hulls.
    pub volume: f64,
    /// Set when the pipeline stopped early.
    pub degenerate: Option<DegenerateReason>,
}

impl Score {
    #[must_use]
    pub const fn degenerate(reason: DegenerateReason) -> Self {
        Self {
            value: 0.0,
            volume: 0.0,
            degenerate: Some(reason),
        }
    }

    #[must_use]
    pub fn from_volume(volume: f64, f_k: f64) -> Self {
        Self {
            value: volume * (1.0 - f_k),
            volume,
            degenerate: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.degenerate.is_some()
    }
}

/// Everything a score computation can be tuned with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparabilityConfig {
    pub tolerance: Tolerance,
    pub lp: LpOptions,
    /// Build per-class hulls on the rayon pool.
    pub parallel: bool,
}

impl Default for SeparabilityConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            lp: LpOptions::default(),
            parallel: true,
        }
    }
}

impl SeparabilityConfig {
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn with_lp(mut self, lp: LpOptions) -> Self {
        self.lp = lp;
        self
    }

    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// # Errors
    /// [`ConfigError::InvalidTolerance`] for any out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tolerance.validate()?;
        self.lp.validate()
    }
}

/// Computes separability scores under a fixed configuration.
///
/// Holds no per-call state; one aggregator can serve concurrent callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScoreAggregator {
    config: SeparabilityConfig,
}

impl ScoreAggregator {
    #[must_use]
    pub const fn new(config: SeparabilityConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SeparabilityConfig {
        &self.config
    }

    /// Score `points` grouped by `labels`, scaled by `1 − f_k`.
    ///
    /// Points must all have the same dimension N, and exactly N distinct
    /// labels must occur.
    ///
    /// # Errors
    /// [`crate::Error::Config`] for invalid input or configuration,
    /// [`crate::Error::Computation`] if a stage fails numerically.
    pub fn score<P, L>(&self, points: &[P], labels: &[L], f_k: f64) -> Result<Score>
    where
        P: AsRef<[f64]>,
        L: Clone + Eq + Hash + Ord + Sync,
    {
        if !f_k.is_finite() {
            return Err(ConfigError::NonFiniteFactor(f_k).into());
        }
        self.config.validate()?;

        let classes = partition(points, labels)?;
        let dim = classes.dim();
        let tolerance = self.config.tolerance.resolve(classes.coordinate_scale());

        if dim < 2 {
            return Ok(stop(DegenerateReason::SingleClass));
        }
        if classes.min_class_size() < dim + 1 {
            return Ok(stop(DegenerateReason::InsufficientPoints));
        }

        let builder = ConvexHullBuilder::new(tolerance.coplanarity);
        let outcomes: Vec<_> = if self.config.parallel {
            classes
                .classes()
                .par_iter()
                .map(|class| builder.build(&class.points))
                .collect()
        } else {
            classes
                .classes()
                .iter()
                .map(|class| builder.build(&class.points))
                .collect()
        };

        let mut systems: Vec<HRepresentation> = Vec::with_capacity(dim);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome? {
                HullOutcome::Full(hull) => {
                    let system = hull.to_h_representation();
                    debug!(class = index, facets = system.len(), "class hull");
                    systems.push(system);
                }
                HullOutcome::Degenerate(HullDegeneracy::TooFewPoints { .. }) => {
                    return Ok(stop(DegenerateReason::InsufficientPoints));
                }
                HullOutcome::Degenerate(HullDegeneracy::Flat { rank }) => {
                    debug!(class = index, rank, "class hull is flat");
                    return Ok(stop(DegenerateReason::FlatHull));
                }
            }
        }

        let stacked = intersect(&systems)?;
        let mut polytope = Polytope::from_h_representation(stacked, tolerance, self.config.lp);

        if !polytope.has_interior()? {
            return Ok(stop(DegenerateReason::EmptyInterior));
        }
        if polytope.vertices()?.len() < dim + 1 {
            return Ok(stop(DegenerateReason::InsufficientVertices));
        }

        let score = Score::from_volume(polytope.volume()?, f_k);
        debug!(volume = score.volume, value = score.value, "separability score");
        Ok(score)
    }
}

fn stop(reason: DegenerateReason) -> Score {
    debug!(%reason, "degenerate score");
    Score::degenerate(reason)
}

/// [`ScoreAggregator::score`] with the default configuration.
///
/// # Errors
/// As for [`ScoreAggregator::score`].
pub fn separability_score<P, L>(points: &[P], labels: &[L], f_k: f64) -> Result<Score>
where
    P: AsRef<[f64]>,
    L: Clone + Eq + Hash + Ord + Sync,
{
    ScoreAggregator::default().score(points, labels, f_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    /// Class 0 is the square [0, 2]², class 1 the square [1, 3] × [0, 2].
    fn overlapping_squares() -> (Vec<[f64; 2]>, Vec<u32>) {
        let points = vec![
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 2.0],
            [0.0, 2.0],
            [1.0, 0.0],
            [3.0, 0.0],
            [3.0, 2.0],
            [1.0, 2.0],
        ];
        let labels = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (points, labels)
    }

    #[test]
    fn test_overlapping_squares() {
        let (points, labels) = overlapping_squares();
        let score = separability_score(&points, &labels, 0.25).unwrap();
        assert!(!score.is_degenerate());
        assert!((score.volume - 2.0).abs() < 1e-9);
        assert!((score.value - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let (points, labels) = overlapping_squares();
        let sequential = ScoreAggregator::new(SeparabilityConfig::default().with_parallel(false))
            .score(&points, &labels, 0.0)
            .unwrap();
        let parallel = separability_score(&points, &labels, 0.0).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_single_class() {
        let score = separability_score(&[[0.0], [1.0], [2.0]], &["a", "a", "a"], 0.0).unwrap();
        assert_eq!(score, Score::degenerate(DegenerateReason::SingleClass));
    }

    #[test]
    fn test_insufficient_points() {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0], [6.0, 5.0]];
        let labels = [0, 0, 0, 1, 1];
        let score = separability_score(&points, &labels, 0.5).unwrap();
        assert_eq!(score.degenerate, Some(DegenerateReason::InsufficientPoints));
        assert!(score.value.abs() < f64::EPSILON);
    }

    #[test]
    fn test_flat_hull() {
        let points = [
            [0.0, 0.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [1.0, 1.0],
        ];
        let labels = [0, 0, 0, 1, 1, 1];
        let score = separability_score(&points, &labels, 0.0).unwrap();
        assert_eq!(score.degenerate, Some(DegenerateReason::FlatHull));
    }

    #[test]
    fn test_disjoint_classes() {
        let points = [
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [5.0, 5.0],
            [6.0, 5.0],
            [5.0, 6.0],
        ];
        let labels = [0, 0, 0, 1, 1, 1];
        let score = separability_score(&points, &labels, 0.0).unwrap();
        assert_eq!(score.degenerate, Some(DegenerateReason::EmptyInterior));
    }

    #[test]
    fn test_config_errors() {
        let (points, labels) = overlapping_squares();
        assert!(matches!(
            separability_score(&points, &labels, f64::NAN),
            Err(Error::Config(ConfigError::NonFiniteFactor(_)))
        ));
        assert!(matches!(
            separability_score(&points, &labels, f64::INFINITY),
            Err(Error::Config(ConfigError::NonFiniteFactor(_)))
        ));

        let bad = SeparabilityConfig::default().with_tolerance(Tolerance::uniform(-1.0));
        assert!(matches!(
            ScoreAggregator::new(bad).score(&points, &labels, 0.0),
            Err(Error::Config(ConfigError::InvalidTolerance { .. }))
        ));
    }

    #[test]
    fn test_reason_tags() {
        assert_eq!(DegenerateReason::EmptyInterior.to_string(), "empty-interior");
        let json = serde_json::to_string(&DegenerateReason::InsufficientVertices).unwrap();
        assert_eq!(json, "\"insufficient-vertices\"");
        let reason: DegenerateReason = serde_json::from_str("\"flat-hull\"").unwrap();
        assert_eq!(reason, DegenerateReason::FlatHull);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SeparabilityConfig =
            serde_json::from_str(r#"{ "parallel": false, "lp": { "max_iter": 10 } }"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.lp.max_iter, 10);
        assert_eq!(config.tolerance, Tolerance::default());
    }
}
