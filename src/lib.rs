//! # `hull_separability`
//!
//! A geometric class-overlap metric: build the convex hull of every class's
//! points, intersect the hulls, and measure the N-dimensional volume of what
//! they share. Larger volume means the classes are less separable.
//!
//! ## What is this?
//!
//! Given M points in ℝᴺ labelled with exactly N distinct classes (the
//! dimension and the class count are the same N), the score is
//!
//! ```text
//! score = vol( conv(P₁) ∩ conv(P₂) ∩ … ∩ conv(P_N) ) · (1 − f_k)
//! ```
//!
//! where `f_k` is a caller-supplied scaling factor. Degenerate geometry
//! (a class too small or flat, hulls that do not overlap, an intersection
//! of dimension < N) gives a score of zero tagged with a reason, not an
//! error.
//!
//! ## Quick Start
//!
//! ```rust
//! use hull_separability::{DegenerateReason, separability_score};
//!
//! // Two squares in the plane overlapping in [1, 2] x [0, 2]
//! let points = [
//!     [0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], // class "a"
//!     [1.0, 0.0], [3.0, 0.0], [3.0, 2.0], [1.0, 2.0], // class "b"
//! ];
//! let labels = ["a", "a", "a", "a", "b", "b", "b", "b"];
//!
//! let score = separability_score(&points, &labels, 0.5)?;
//! assert!((score.volume - 2.0).abs() < 1e-9);
//! assert!((score.value - 1.0).abs() < 1e-9);
//! assert!(score.degenerate.is_none());
//!
//! // Moving class "b" away leaves no shared interior
//! let apart: Vec<[f64; 2]> = points
//!     .iter()
//!     .zip(&labels)
//!     .map(|(p, &l)| if l == "b" { [p[0] + 10.0, p[1]] } else { *p })
//!     .collect();
//! let score = separability_score(&apart, &labels, 0.5)?;
//! assert_eq!(score.degenerate, Some(DegenerateReason::EmptyInterior));
//! assert_eq!(score.value, 0.0);
//! # Ok::<(), hull_separability::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! | Stage               | Module              | Method                                 |
//! |---------------------|---------------------|----------------------------------------|
//! | Partition           | [`partition()`]     | group by label, validate N             |
//! | Class hulls         | [`ConvexHullBuilder`] | beneath-beyond, simplicial facets    |
//! | Intersection        | [`intersect`]       | stack the halfspace systems            |
//! | Interior point      | [`chebyshev_center`] | dense simplex, Bland's rule           |
//! | Vertices            | [`enumerate_vertices`] | polar duality + hull                |
//! | Volume              | [`polytope_volume`] | centroid fan, `abs(det) / N!`         |
//!
//! Per-class hulls are built on the rayon pool. Every geometric predicate
//! shares one [`Tolerance`] policy, relative to the extent of the input.
//!
//! ## When NOT to Use
//!
//! - Large N: facet counts of N-dimensional hulls grow like `n^⌊N/2⌋`
//! - Exact arithmetic required (we use f64 with scaled tolerances)

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod halfspace;
mod hull;
mod intersection;
mod lp;
mod partition;
mod polytope;
mod score;
mod spatial_hash;
mod tolerance;
mod vertex_enum;
mod volume;

pub use error::{ComputationError, ConfigError, Error, Result, Stage};
pub use halfspace::{Classification, HRepresentation, HalfSpace, Point};
pub use hull::{ConvexHull, ConvexHullBuilder, Facet, HullDegeneracy, HullOutcome};
pub use intersection::intersect;
pub use lp::{LpOptions, LpResult, LpStatus, chebyshev_center};
pub use partition::{Partition, PointClass, partition};
pub use polytope::Polytope;
pub use score::{DegenerateReason, Score, ScoreAggregator, SeparabilityConfig, separability_score};
pub use spatial_hash::SpatialHash;
pub use tolerance::{CoordinateScale, DEFAULT_TOLERANCE, ScaledTolerance, Tolerance};
pub use vertex_enum::{VertexSet, enumerate_vertices};
pub use volume::polytope_volume;

/// Re-export nalgebra types for convenience
pub mod math {
    pub use nalgebra::{DMatrix, DVector};
}
