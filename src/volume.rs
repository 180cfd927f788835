//! N-dimensional polytope volume.
//!
//! The hull of the vertices is triangulated by coning every (simplicial)
//! facet to an interior apex, and the simplex volumes
//! `|det(p₁ − apex, …, p_N − apex)| / N!` are summed. Any interior apex gives
//! a valid decomposition; the vertex centroid is used.

use nalgebra::DMatrix;
use tracing::debug;

use crate::error::{ComputationError, Stage};
use crate::halfspace::Point;
use crate::hull::{ConvexHullBuilder, HullOutcome};
use crate::tolerance::ScaledTolerance;
use crate::vertex_enum::VertexSet;

/// Volume of the convex hull of `vertices`.
///
/// Fewer than N+1 vertices, or vertices spanning less than N dimensions,
/// give `0.0`.
///
/// # Errors
/// [`ComputationError::NumericalInstability`] if the hull of the vertices
/// cannot be built consistently or the sum is not a finite non-negative
/// number.
pub fn polytope_volume(
    vertices: &VertexSet,
    tolerance: &ScaledTolerance,
) -> Result<f64, ComputationError> {
    let dim = vertices.dim();
    if vertices.len() < dim + 1 {
        return Ok(0.0);
    }

    let hull = match ConvexHullBuilder::new(tolerance.coplanarity)
        .build(vertices.as_slice())
        .map_err(|err| err.in_stage(Stage::VolumeComputation))?
    {
        HullOutcome::Full(hull) => hull,
        HullOutcome::Degenerate(degeneracy) => {
            debug!(?degeneracy, "vertex hull is degenerate, volume is zero");
            return Ok(0.0);
        }
    };

    let volume = hull.volume();
    if !volume.is_finite() || volume < 0.0 {
        return Err(ComputationError::unstable(
            Stage::VolumeComputation,
            format!("fan decomposition summed to {volume}"),
        ));
    }

    debug!(
        dim,
        vertices = vertices.len(),
        simplices = hull.facets().len(),
        volume,
        "computed polytope volume"
    );
    Ok(volume)
}

/// Total volume of the simplices formed by `apex` and each facet in
/// `facets` (N points each).
pub(crate) fn fan_volume<'a>(
    apex: &Point,
    facets: impl IntoIterator<Item = Vec<&'a Point>>,
) -> f64 {
    let total: f64 = facets
        .into_iter()
        .map(|facet| simplex_volume_unscaled(apex, &facet))
        .sum();
    total / factorial(apex.len())
}

/// `|det(p₁ − apex, …, p_N − apex)|`, i.e. N! times the simplex volume.
fn simplex_volume_unscaled(apex: &Point, facet: &[&Point]) -> f64 {
    let dim = apex.len();
    debug_assert_eq!(facet.len(), dim);
    DMatrix::from_fn(dim, dim, |r, c| facet[r][c] - apex[c])
        .determinant()
        .abs()
}

/// `n!` as a float.
#[allow(clippy::cast_precision_loss)]
fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}
