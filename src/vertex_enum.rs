//! # Vertex Enumeration
//!
//! Converts a bounded halfspace system with a known strict interior point
//! into its vertex set, via polar duality.
//!
//! ## Algorithm
//!
//! With the interior point `x*` moved to the origin every row reads
//! `a_i · y ≤ b'_i` with `b'_i > 0`, and the polytope `P − x*` is the polar of
//!
//! ```text
//! Q = conv { a_i / b'_i }
//! ```
//!
//! so the vertices of `P` correspond one-to-one to the facets of `Q`: a dual
//! facet `n · y ≤ c` (unit `n`, `c > 0`) is the primal vertex `x* + n / c`.
//! Redundant rows become dual points inside `Q` and drop out of its hull;
//! degenerate primal vertices (more than N tight rows) become coplanar dual
//! facets, merged before the mapping.
//!
//! `P` is bounded exactly when the origin lies strictly inside `Q`.

use tracing::debug;

use crate::error::{ComputationError, Stage};
use crate::halfspace::{HRepresentation, Point};
use crate::hull::{ConvexHullBuilder, HullOutcome};
use crate::spatial_hash::SpatialHash;
use crate::tolerance::{CoordinateScale, ScaledTolerance};

/// Vertex residuals are checked against the coplanarity tolerance times this.
const RESIDUAL_SLACK: f64 = 1e3;

/// Points describing a polytope, pairwise farther apart than the merge
/// tolerance. Enumeration and [`crate::Polytope`] only ever store extreme
/// points here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexSet {
    dim: usize,
    vertices: Vec<Point>,
}

impl VertexSet {
    /// Collect `points`, dropping any within `merge_tolerance` of one already
    /// kept.
    #[must_use]
    pub fn from_points(
        dim: usize,
        points: impl IntoIterator<Item = Point>,
        merge_tolerance: f64,
    ) -> Self {
        let mut seen = SpatialHash::new(merge_tolerance);
        let vertices = points
            .into_iter()
            .filter(|p| seen.insert_if_unique(p.as_slice()))
            .collect();
        Self { dim, vertices }
    }

    /// An empty set.
    #[must_use]
    pub const fn empty(dim: usize) -> Self {
        Self {
            dim,
            vertices: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.vertices.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Point] {
        &self.vertices
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Point> {
        self.vertices
    }
}

/// Enumerate the vertices of `{ x : system }` given a strict interior point.
///
/// # Errors
/// - [`ComputationError::UnboundedPolytope`] if the system does not bound a
///   region around `interior`.
/// - [`ComputationError::NumericalInstability`] if `interior` is not strictly
///   inside, the dual hull fails, or a computed vertex violates the system.
pub fn enumerate_vertices(
    system: &HRepresentation,
    interior: &Point,
    tolerance: &ScaledTolerance,
) -> Result<VertexSet, ComputationError> {
    let dim = system.dim();
    let centered = system.translated(interior);

    let mut duals: Vec<Point> = Vec::with_capacity(centered.len());
    for (row, hs) in centered.iter().enumerate() {
        if hs.offset <= 0.0 {
            return Err(ComputationError::unstable(
                Stage::VertexEnumeration,
                format!(
                    "interior point violates row {row} by {:.3e}",
                    -hs.offset
                ),
            ));
        }
        duals.push(&hs.normal / hs.offset);
    }

    let dual_tolerance =
        tolerance.rescaled(&CoordinateScale::of_points(duals.iter().map(|p| p.as_slice())));

    let dual_hull = match ConvexHullBuilder::new(dual_tolerance.coplanarity)
        .build(&duals)
        .map_err(|err| err.in_stage(Stage::VertexEnumeration))?
    {
        HullOutcome::Full(hull) => hull,
        HullOutcome::Degenerate(_) => return Err(ComputationError::UnboundedPolytope),
    };

    let dual_facets = dual_hull.to_h_representation();
    let mut candidates = Vec::with_capacity(dual_facets.len());
    for plane in dual_facets.iter() {
        if plane.offset <= dual_tolerance.coplanarity {
            return Err(ComputationError::UnboundedPolytope);
        }
        candidates.push(&plane.normal / plane.offset + interior);
    }

    let limit = RESIDUAL_SLACK * tolerance.coplanarity;
    if let Some((idx, vertex)) = candidates
        .iter()
        .enumerate()
        .find(|(_, vertex)| !system.contains(vertex, limit))
    {
        return Err(ComputationError::unstable(
            Stage::VertexEnumeration,
            format!(
                "vertex {idx} violates the system by {:.3e}",
                -system.margin(vertex)
            ),
        ));
    }

    let vertices = VertexSet::from_points(dim, candidates, tolerance.vertex_merge);

    debug!(
        rows = system.len(),
        dual_facets = dual_facets.len(),
        vertices = vertices.len(),
        "enumerated vertices"
    );
    Ok(vertices)
}
