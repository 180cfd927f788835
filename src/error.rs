//! Error types.
//!
//! Invalid input is a [`ConfigError`]; a computation that cannot produce a
//! consistent answer within tolerance is a [`ComputationError`]. Degenerate
//! geometry (empty or flat intersections) is NOT an error, see
//! [`crate::DegenerateReason`].

use std::fmt;

use thiserror::Error;

/// Invalid input, surfaced before any geometry is computed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// No points were supplied, so the dimension cannot be inferred.
    #[error("no points supplied")]
    EmptyInput,

    /// Points have zero coordinates.
    #[error("points must have at least one coordinate")]
    ZeroDimension,

    /// `points` and `labels` differ in length.
    #[error("got {points} points but {labels} labels")]
    LengthMismatch { points: usize, labels: usize },

    /// A point (or halfspace) does not have the expected dimension.
    #[error("item {index} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("point {index} has a non-finite coordinate on axis {axis}")]
    NonFiniteCoordinate { index: usize, axis: usize },

    /// The number of distinct labels differs from the point dimension.
    #[error("expected {expected} distinct labels (one per dimension), found {actual}")]
    LabelCardinality { expected: usize, actual: usize },

    /// The scaling factor is NaN or infinite.
    #[error("scaling factor must be finite, got {0}")]
    NonFiniteFactor(f64),

    /// A tolerance is non-finite or not positive.
    #[error("tolerance `{name}` must be finite and positive, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
}

/// Pipeline stage that failed numerically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    HullConstruction,
    VertexEnumeration,
    VolumeComputation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HullConstruction => "hull construction",
            Self::VertexEnumeration => "vertex enumeration",
            Self::VolumeComputation => "volume computation",
        })
    }
}

/// The computation could not finish with a trustworthy result.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ComputationError {
    /// A representation could not be made consistent within tolerance.
    #[error("numerical instability during {stage}: {detail}")]
    NumericalInstability { stage: Stage, detail: String },

    /// The inscribed-margin LP has no finite optimum.
    #[error("feasibility LP is unbounded")]
    LpUnbounded,

    /// The simplex solver hit its iteration limit.
    #[error("feasibility LP did not converge after {iterations} iterations")]
    LpNonConvergence { iterations: usize },

    /// A halfspace system does not describe a bounded polytope.
    #[error("halfspace system describes an unbounded region")]
    UnboundedPolytope,
}

impl ComputationError {
    pub(crate) fn unstable(stage: Stage, detail: impl Into<String>) -> Self {
        Self::NumericalInstability {
            stage,
            detail: detail.into(),
        }
    }

    /// Attribute an instability raised by a shared routine to `stage`.
    #[must_use]
    pub(crate) fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::NumericalInstability { detail, .. } => Self::NumericalInstability { stage, detail },
            other => other,
        }
    }
}

/// Any failure of a score computation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let errors: Vec<Error> = vec![
            ConfigError::EmptyInput.into(),
            ConfigError::LabelCardinality {
                expected: 3,
                actual: 2,
            }
            .into(),
            ComputationError::unstable(Stage::HullConstruction, "ridge shared by 3 facets").into(),
            ComputationError::LpNonConvergence { iterations: 10 }.into(),
        ];

        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(messages[0], "no points supplied");
        assert_eq!(
            messages[1],
            "expected 3 distinct labels (one per dimension), found 2"
        );
        assert_eq!(
            messages[2],
            "numerical instability during hull construction: ridge shared by 3 facets"
        );
        assert!(messages[3].contains("10 iterations"));
    }

    #[test]
    fn test_from_conversions() {
        let err: Error = ComputationError::LpUnbounded.into();
        assert!(matches!(err, Error::Computation(ComputationError::LpUnbounded)));

        let err: Error = ConfigError::NonFiniteFactor(f64::NAN).into();
        assert!(matches!(err, Error::Config(ConfigError::NonFiniteFactor(_))));
    }
}
