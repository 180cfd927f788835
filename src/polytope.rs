//! # Dual-Representation Polytope
//!
//! A bounded convex polytope known by its halfspaces, its vertices, or both.
//! Whichever representation is missing is derived on first request and
//! cached, as are the inscribed-margin LP result and the volume.
//!
//! | Request              | Derived from              | Via                      |
//! |----------------------|---------------------------|--------------------------|
//! | `h_representation`   | vertices                  | convex hull              |
//! | `interior`           | halfspaces                | Chebyshev-center LP      |
//! | `vertices`           | halfspaces + interior     | polar-dual enumeration   |
//! | `volume`             | vertices                  | centroid-fan sum         |
//!
//! A polytope without interior (empty, or of dimension < N) has no vertices
//! in this sense and volume zero.

use nalgebra::DVector;
use tracing::trace;

use crate::error::{ComputationError, Stage};
use crate::halfspace::{HRepresentation, Point};
use crate::hull::{ConvexHullBuilder, HullOutcome};
use crate::lp::{LpOptions, LpResult, LpStatus, chebyshev_center};
use crate::tolerance::ScaledTolerance;
use crate::vertex_enum::{VertexSet, enumerate_vertices};
use crate::volume::polytope_volume;

/// Halfspace side of the cache.
#[derive(Clone, Debug)]
enum Facets {
    /// Not derived yet; the vertices are known.
    Pending,
    Known(HRepresentation),
    /// The vertices span fewer than N dimensions.
    LowerDimensional,
}

/// A convex polytope with lazily derived H- and V-representations.
#[derive(Clone, Debug)]
pub struct Polytope {
    dim: usize,
    tolerance: ScaledTolerance,
    lp: LpOptions,
    facets: Facets,
    vertices: Option<VertexSet>,
    interior: Option<LpResult>,
    volume: Option<f64>,
}

impl Polytope {
    /// A polytope given as `{ x : system }`, assumed bounded.
    #[must_use]
    pub fn from_h_representation(
        system: HRepresentation,
        tolerance: ScaledTolerance,
        lp: LpOptions,
    ) -> Self {
        Self {
            dim: system.dim(),
            tolerance,
            lp,
            facets: Facets::Known(system),
            vertices: None,
            interior: None,
            volume: None,
        }
    }

    /// The convex hull of `vertices`.
    #[must_use]
    pub fn from_vertices(
        vertices: VertexSet,
        tolerance: ScaledTolerance,
        lp: LpOptions,
    ) -> Self {
        Self {
            dim: vertices.dim(),
            tolerance,
            lp,
            facets: Facets::Pending,
            vertices: Some(vertices),
            interior: None,
            volume: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub const fn tolerance(&self) -> &ScaledTolerance {
        &self.tolerance
    }

    /// Halfspace representation, or `None` if the polytope was given by
    /// vertices that do not span N dimensions.
    ///
    /// # Errors
    /// Hull construction failures.
    pub fn h_representation(&mut self) -> Result<Option<&HRepresentation>, ComputationError> {
        if matches!(self.facets, Facets::Pending) {
            self.derive_facets()?;
        }
        Ok(match &self.facets {
            Facets::Known(system) => Some(system),
            Facets::Pending | Facets::LowerDimensional => None,
        })
    }

    /// Chebyshev center and inscribed margin.
    ///
    /// A lower-dimensional polytope reports margin 0 at its vertex centroid,
    /// and an empty vertex list reports margin −∞; both are
    /// [`LpStatus::EmptyInterior`].
    ///
    /// # Errors
    /// LP failures, and hull construction failures for a polytope given by
    /// vertices.
    pub fn interior(&mut self) -> Result<&LpResult, ComputationError> {
        let result = match self.interior.take() {
            Some(result) => result,
            None => self.solve_interior()?,
        };
        Ok(&*self.interior.insert(result))
    }

    /// Whether the polytope has a strict interior point.
    ///
    /// # Errors
    /// As for [`Polytope::interior`].
    pub fn has_interior(&mut self) -> Result<bool, ComputationError> {
        Ok(self.interior()?.is_interior())
    }

    /// Vertices. For a polytope given by halfspaces this is empty when there
    /// is no interior; for one given by points, points that are not extreme
    /// are dropped.
    ///
    /// # Errors
    /// LP, vertex enumeration and hull construction failures.
    pub fn vertices(&mut self) -> Result<&VertexSet, ComputationError> {
        if matches!(self.facets, Facets::Pending) {
            self.derive_facets()?;
        }
        let vertices = match self.vertices.take() {
            Some(vertices) => vertices,
            None => self.enumerate()?,
        };
        Ok(&*self.vertices.insert(vertices))
    }

    /// N-dimensional volume.
    ///
    /// # Errors
    /// Any failure while deriving the vertices or their hull.
    pub fn volume(&mut self) -> Result<f64, ComputationError> {
        if let Some(volume) = self.volume {
            return Ok(volume);
        }
        let tolerance = self.tolerance;
        let volume = polytope_volume(self.vertices()?, &tolerance)?;
        self.volume = Some(volume);
        Ok(volume)
    }

    /// Hull the given points: keep the facets and reduce the points to the
    /// hull's vertices.
    fn derive_facets(&mut self) -> Result<(), ComputationError> {
        let Some(vertices) = &self.vertices else {
            self.facets = Facets::LowerDimensional;
            return Ok(());
        };
        let outcome = ConvexHullBuilder::new(self.tolerance.coplanarity)
            .build(vertices.as_slice())
            .map_err(|err| err.in_stage(Stage::HullConstruction))?;
        self.facets = match outcome {
            HullOutcome::Full(hull) => {
                let system = hull.to_h_representation();
                let extreme = VertexSet::from_points(self.dim, hull.vertices(), self.tolerance.vertex_merge);
                trace!(
                    rows = system.len(),
                    dropped = vertices.len() - extreme.len(),
                    "derived facets from vertices"
                );
                self.vertices = Some(extreme);
                Facets::Known(system)
            }
            HullOutcome::Degenerate(_) => Facets::LowerDimensional,
        };
        Ok(())
    }

    fn solve_interior(&mut self) -> Result<LpResult, ComputationError> {
        let margin = self.tolerance.interior_margin;
        let lp = self.lp;
        if let Some(system) = self.h_representation()? {
            return chebyshev_center(system, margin, &lp);
        }

        let (point, margin) = match self.vertices.as_ref().filter(|v| !v.is_empty()) {
            Some(vertices) => {
                #[allow(clippy::cast_precision_loss)]
                let centroid = vertices
                    .iter()
                    .fold(DVector::<f64>::zeros(self.dim), |acc, p| acc + p)
                    / vertices.len() as f64;
                (centroid, 0.0)
            }
            None => (Point::zeros(self.dim), f64::NEG_INFINITY),
        };
        Ok(LpResult {
            margin,
            point,
            status: LpStatus::EmptyInterior,
            iterations: 0,
        })
    }

    fn enumerate(&mut self) -> Result<VertexSet, ComputationError> {
        let interior = self.interior()?;
        if !interior.is_interior() {
            return Ok(VertexSet::empty(self.dim));
        }
        let center = interior.point.clone();
        let tolerance = self.tolerance;
        match self.h_representation()? {
            Some(system) => enumerate_vertices(system, &center, &tolerance),
            None => Ok(VertexSet::empty(self.dim)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tolerance::Tolerance;

    fn v(coords: &[f64]) -> Point {
        Point::from_column_slice(coords)
    }

    fn tolerance() -> ScaledTolerance {
        Tolerance::default().at_scale(1.0)
    }

    #[test]
    fn test_from_halfspaces() {
        let system = HRepresentation::bounding_box(&v(&[0.0, 0.0]), &v(&[1.0, 0.5]));
        let mut polytope = Polytope::from_h_representation(system, tolerance(), LpOptions::default());

        assert!(polytope.has_interior().unwrap());
        assert!((polytope.interior().unwrap().margin - 0.25).abs() < 1e-12);
        assert_eq!(polytope.vertices().unwrap().len(), 4);
        assert!((polytope.volume().unwrap() - 0.5).abs() < 1e-12);
        // Cached
        assert!((polytope.volume().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_from_vertices() {
        let square = VertexSet::from_points(
            2,
            [v(&[0.0, 0.0]), v(&[2.0, 0.0]), v(&[2.0, 2.0]), v(&[0.0, 2.0]), v(&[1.0, 1.0])],
            1e-12,
        );
        let mut polytope = Polytope::from_vertices(square, tolerance(), LpOptions::default());

        assert_eq!(polytope.h_representation().unwrap().map(HRepresentation::len), Some(4));
        // The centre point is not a vertex of the square
        let vertices = polytope.vertices().unwrap();
        assert_eq!(vertices.len(), 4);
        assert!(vertices.iter().all(|p| (p.clone() - v(&[1.0, 1.0])).norm() > 0.5));
        let interior = polytope.interior().unwrap();
        assert!(interior.is_interior());
        assert!((interior.margin - 1.0).abs() < 1e-12);
        assert!((interior.point.clone() - v(&[1.0, 1.0])).norm() < 1e-9);
        assert!((polytope.volume().unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_intersection() {
        let mut system = HRepresentation::bounding_box(&v(&[0.0, 0.0]), &v(&[1.0, 1.0]));
        system
            .extend_from(&HRepresentation::bounding_box(&v(&[3.0, 0.0]), &v(&[4.0, 1.0])))
            .unwrap();
        let mut polytope = Polytope::from_h_representation(system, tolerance(), LpOptions::default());

        assert!(!polytope.has_interior().unwrap());
        assert!(polytope.vertices().unwrap().is_empty());
        assert!(polytope.volume().unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_flat_vertices() {
        let segment = VertexSet::from_points(2, [v(&[0.0, 0.0]), v(&[1.0, 1.0]), v(&[2.0, 2.0])], 1e-12);
        let mut polytope = Polytope::from_vertices(segment, tolerance(), LpOptions::default());

        assert!(polytope.h_representation().unwrap().is_none());
        let interior = polytope.interior().unwrap();
        assert_eq!(interior.status, LpStatus::EmptyInterior);
        assert!((interior.point.clone() - v(&[1.0, 1.0])).norm() < 1e-12);
        assert!(polytope.volume().unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_vertex_set() {
        let mut polytope =
            Polytope::from_vertices(VertexSet::empty(3), tolerance(), LpOptions::default());
        assert!(polytope.h_representation().unwrap().is_none());
        assert!(polytope.interior().unwrap().margin.is_infinite());
        assert!(polytope.volume().unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_vertices_drop_interior_points_before_facets() {
        let points = VertexSet::from_points(
            2,
            [v(&[0.0, 0.0]), v(&[0.5, 0.5]), v(&[3.0, 0.0]), v(&[1.0, 0.2]), v(&[0.0, 3.0])],
            1e-12,
        );
        let mut polytope = Polytope::from_vertices(points, tolerance(), LpOptions::default());

        assert_eq!(polytope.vertices().unwrap().len(), 3);
        assert!((polytope.volume().unwrap() - 4.5).abs() < 1e-12);
    }
}
