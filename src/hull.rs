//! # N-dimensional Convex Hull Construction
//!
//! Builds the half-space representation of the convex hull of a finite point
//! set in ℝᴺ with the **beneath-beyond** algorithm.
//!
//! ## Algorithm Overview
//!
//! 1. **Initial simplex**: Greedily pick N+1 affinely independent points, each
//!    maximizing its distance to the affine hull of those already chosen
//!    (Gram-Schmidt residual). If no point leaves that hull by more than ε, the
//!    point set is flat.
//! 2. **Conflict lists**: Every other point is attached to the facet it lies
//!    farthest beyond. Points more than ε beyond are *outside*; points within
//!    ε are kept as *coplanar* and looked at again whenever their facet is
//!    replaced.
//! 3. **Insertion**: The farthest outside point of a facet is inserted. The
//!    visible region grows from that facet across shared ridges, so it is
//!    always connected. If its horizon touches itself at a lower-dimensional
//!    face, the facets around that face join the region until the horizon is
//!    a closed ridge cycle. Visible facets are removed, each horizon ridge is
//!    coned to the new point, and the points of removed facets (including
//!    vertices the cone buried) are attached to the remaining facets.
//! 4. **Rescan**: Once no facet has outside points, every point is checked
//!    against the finished facets again. Anything still outside, which
//!    rounding near ε can leave behind, is inserted in another round.
//! 5. **Validation**: Every ridge must be shared by exactly two facets, and
//!    every input point must lie within tolerance of the final hull.
//!
//! Facets are simplicial (N vertices each), so coplanar input produces
//! several facets on one hyperplane. [`ConvexHull::to_h_representation`]
//! merges them.
//!
//! ## Orientation
//!
//! The centroid of the initial simplex stays strictly inside the hull, and
//! because the hull only grows, its distance to any facet hyperplane never
//! drops below its distance to the initial simplex boundary. Requiring that
//! distance to exceed 2ε makes every later orientation test unambiguous.
//!
//! ## Complexity
//!
//! | Operation         | Complexity        | Notes                            |
//! |-------------------|-------------------|----------------------------------|
//! | Initial simplex   | O(n · N²)         | One residual pass per dimension  |
//! | Insert point      | O(F · N + V · N²) | Region growth, horizon hashing   |
//! | Reassign point    | O(F · N)          | Argmax over active facets        |
//! | Facet hyperplane  | O(N⁴)             | N cofactor determinants          |
//! | Validation        | O(n · F · N)      | Containment of every input point |

use std::cmp::Ordering;

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::error::{ComputationError, Stage};
use crate::halfspace::{HRepresentation, HalfSpace, Point};
use crate::spatial_hash::SpatialHash;
use crate::tolerance::CoordinateScale;
use crate::volume::fan_volume;

/// Slack applied to ε when validating the finished hull.
const VALIDATION_SLACK: f64 = 2.0;

/// Full passes re-checking every point against the finished facets.
const MAX_RESCANS: usize = 8;

/// A simplicial facet: N hull points spanning a supporting hyperplane.
#[derive(Clone, Debug)]
pub struct Facet {
    /// Indices into the hull's point list, ascending.
    pub vertices: Vec<usize>,
    /// Supporting half-space, normal pointing away from the hull.
    pub plane: HalfSpace,
}

impl Facet {
    /// The facet's ridges: its vertex list with one vertex dropped, in order.
    fn ridges(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        (0..self.vertices.len()).map(move |skip| without(&self.vertices, skip))
    }

    fn contains_vertex(&self, idx: usize) -> bool {
        self.vertices.binary_search(&idx).is_ok()
    }
}

/// Why a point set has no full-dimensional hull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HullDegeneracy {
    /// Fewer than N+1 points.
    TooFewPoints { required: usize, actual: usize },
    /// The points span an affine subspace of dimension `rank` < N.
    Flat { rank: usize },
}

/// Result of a hull construction.
#[derive(Clone, Debug)]
pub enum HullOutcome {
    /// A full-dimensional hull.
    Full(ConvexHull),
    /// The hull has zero N-volume.
    Degenerate(HullDegeneracy),
}

impl HullOutcome {
    #[must_use]
    pub fn into_hull(self) -> Option<ConvexHull> {
        match self {
            Self::Full(hull) => Some(hull),
            Self::Degenerate(_) => None,
        }
    }

    #[must_use]
    pub const fn degeneracy(&self) -> Option<HullDegeneracy> {
        match self {
            Self::Full(_) => None,
            Self::Degenerate(d) => Some(*d),
        }
    }
}

/// A full-dimensional convex hull with simplicial facets.
#[derive(Clone, Debug)]
pub struct ConvexHull {
    points: Vec<Point>,
    facets: Vec<Facet>,
    interior: Point,
    epsilon: f64,
}

impl ConvexHull {
    /// Ambient dimension.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.interior.len()
    }

    /// The input points (hull vertices and interior points alike).
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[must_use]
    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// A point strictly inside the hull.
    #[must_use]
    pub const fn interior_point(&self) -> &Point {
        &self.interior
    }

    /// Indices of input points that are hull vertices, ascending.
    #[must_use]
    pub fn vertex_indices(&self) -> Vec<usize> {
        self.facets
            .iter()
            .flat_map(|f| f.vertices.iter().copied())
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Hull vertices, in ascending input order.
    #[must_use]
    pub fn vertices(&self) -> Vec<Point> {
        self.vertex_indices()
            .into_iter()
            .map(|i| self.points[i].clone())
            .collect()
    }

    /// Returns `true` if `point` is inside the hull or within `epsilon` of it.
    #[must_use]
    pub fn contains(&self, point: &DVector<f64>, epsilon: f64) -> bool {
        self.facets
            .iter()
            .all(|f| f.plane.signed_distance(point) <= epsilon)
    }

    /// Facet hyperplanes as an H-representation, with facets that share a
    /// hyperplane (within tolerance) merged into one row.
    #[must_use]
    pub fn to_h_representation(&self) -> HRepresentation {
        let extent = CoordinateScale::of_points(self.points.iter().map(|p| p.as_slice())).reference();
        let mut seen = SpatialHash::new(self.epsilon / extent);

        // Offsets measured from the interior point keep the key translation
        // invariant
        let rows: Vec<HalfSpace> = self
            .facets
            .iter()
            .filter(|facet| {
                let depth = -facet.plane.signed_distance(&self.interior);
                let key: Vec<f64> = facet
                    .plane
                    .normal
                    .iter()
                    .copied()
                    .chain(std::iter::once(depth / extent))
                    .collect();
                seen.insert_if_unique(&key)
            })
            .map(|facet| facet.plane.clone())
            .collect();
        HRepresentation::from_rows(self.dim(), rows)
    }

    /// N-dimensional volume by fanning every facet to the vertex centroid.
    #[must_use]
    pub fn volume(&self) -> f64 {
        let vertices = self.vertex_indices();
        if vertices.is_empty() {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        let apex = vertices
            .iter()
            .fold(DVector::<f64>::zeros(self.dim()), |acc, &i| acc + &self.points[i])
            / vertices.len() as f64;

        fan_volume(
            &apex,
            self.facets.iter().map(|facet| {
                facet
                    .vertices
                    .iter()
                    .map(|&i| &self.points[i])
                    .collect::<Vec<_>>()
            }),
        )
    }
}

/// Builds convex hulls with a fixed coplanarity tolerance.
#[derive(Clone, Copy, Debug)]
pub struct ConvexHullBuilder {
    epsilon: f64,
}

impl ConvexHullBuilder {
    /// `epsilon` is the absolute distance within which a point counts as lying
    /// on a hyperplane.
    #[must_use]
    pub const fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Compute the hull of `points`.
    ///
    /// Returns [`HullOutcome::Degenerate`] for fewer than N+1 points or a flat
    /// point set, and [`ComputationError::NumericalInstability`] if the facets
    /// cannot be made consistent within tolerance.
    pub fn build(&self, points: &[Point]) -> Result<HullOutcome, ComputationError> {
        let Some(first) = points.first() else {
            return Ok(HullOutcome::Degenerate(HullDegeneracy::TooFewPoints {
                required: 1,
                actual: 0,
            }));
        };
        let dim = first.len();
        debug_assert!(points.iter().all(|p| p.len() == dim));

        if points.len() < dim + 1 {
            return Ok(HullOutcome::Degenerate(HullDegeneracy::TooFewPoints {
                required: dim + 1,
                actual: points.len(),
            }));
        }

        let simplex = match initial_simplex(points, self.epsilon) {
            Ok(simplex) => simplex,
            Err(rank) => return Ok(HullOutcome::Degenerate(HullDegeneracy::Flat { rank })),
        };

        #[allow(clippy::cast_precision_loss)]
        let interior = simplex
            .iter()
            .fold(DVector::<f64>::zeros(dim), |acc, &i| acc + &points[i])
            / simplex.len() as f64;

        let mut state = FacetStore::default();
        let mut inradius = f64::INFINITY;
        for skip in 0..simplex.len() {
            let vertices: Vec<usize> = without(&simplex, skip).into_iter().sorted_unstable().collect();
            let Some(plane) = plane_through(points, &vertices, &interior) else {
                return Ok(HullOutcome::Degenerate(HullDegeneracy::Flat { rank: dim - 1 }));
            };
            inradius = inradius.min(-plane.signed_distance(&interior));
            state.alloc(Facet { vertices, plane });
        }

        // A sliver simplex cannot orient later facets reliably
        if inradius <= 2.0 * self.epsilon {
            return Ok(HullOutcome::Degenerate(HullDegeneracy::Flat { rank: dim - 1 }));
        }

        let budget = points.len().saturating_mul(MAX_RESCANS + 1);
        let mut inserted = 0_usize;
        let mut rescans = 0;
        let mut pending = state.reassign_all(points, self.epsilon);
        while pending {
            while let Some((face, idx)) = state.pop_farthest(points) {
                inserted += 1;
                if inserted > budget {
                    return Err(ComputationError::unstable(
                        Stage::HullConstruction,
                        format!("no stable hull after {budget} insertions"),
                    ));
                }
                self.insert_point(&mut state, points, idx, face, &interior)?;
            }
            if rescans == MAX_RESCANS {
                break;
            }
            rescans += 1;
            pending = state.reassign_all(points, self.epsilon);
            if pending {
                trace!(rescans, "re-inserting points left outside the hull");
            }
        }

        let facets: Vec<Facet> = state.into_facets();
        self.validate(points, &facets)?;

        trace!(
            dim,
            points = points.len(),
            facets = facets.len(),
            rescans,
            "built convex hull"
        );

        Ok(HullOutcome::Full(ConvexHull {
            points: points.to_vec(),
            facets,
            interior,
            epsilon: self.epsilon,
        }))
    }

    /// Whether `facet` is visible from `points[idx]`.
    fn sees(&self, facet: &Facet, point: &Point, idx: usize) -> bool {
        facet.plane.signed_distance(point) > self.epsilon && !facet.contains_vertex(idx)
    }

    /// Beneath-beyond insertion of `points[idx]`, an outside point of facet
    /// `start`.
    ///
    /// 1. Grow the visible region from `start` across shared ridges
    /// 2. Collect the horizon (ridges between visible and hidden facets),
    ///    widening the region wherever the horizon pinches
    /// 3. Remove visible facets and cone every horizon ridge to the point
    /// 4. Hand the points of removed facets to the new ones
    fn insert_point(
        &self,
        state: &mut FacetStore,
        points: &[Point],
        idx: usize,
        start: usize,
        interior: &Point,
    ) -> Result<(), ComputationError> {
        let point = &points[idx];

        let mut visible: FxHashSet<usize> = FxHashSet::default();
        visible.insert(start);
        let mut queue = vec![start];
        while let Some(face) = queue.pop() {
            let Some(facet) = state.get(face) else {
                continue;
            };
            for ridge in facet.ridges() {
                for next in state.neighbors(face, &ridge) {
                    if !visible.contains(&next)
                        && state.get(next).is_some_and(|f| self.sees(f, point, idx))
                    {
                        visible.insert(next);
                        queue.push(next);
                    }
                }
            }
        }

        let horizon = loop {
            let horizon = state.horizon(&visible);
            if horizon.is_empty() {
                return Err(ComputationError::unstable(
                    Stage::HullConstruction,
                    format!("point {idx} sees every facet of the hull"),
                ));
            }

            let pinched = pinched_faces(&horizon);
            if pinched.is_empty() {
                break horizon;
            }

            let around: Vec<usize> = state
                .active()
                .filter(|&(i, f)| {
                    !visible.contains(&i)
                        && !f.contains_vertex(idx)
                        && pinched
                            .iter()
                            .any(|face| face.iter().all(|&v| f.contains_vertex(v)))
                })
                .map(|(i, _)| i)
                .collect();
            if around.is_empty() {
                return Err(ComputationError::unstable(
                    Stage::HullConstruction,
                    format!("horizon of point {idx} does not close"),
                ));
            }
            trace!(point = idx, widened = around.len(), "horizon pinched");
            visible.extend(around);
        };

        let rim: FxHashSet<usize> = horizon.iter().flatten().copied().collect();
        let mut orphans: Vec<usize> = Vec::new();
        let mut buried: Vec<usize> = Vec::new();
        for face in visible.into_iter().sorted_unstable() {
            if let Some(slot) = state.free(face) {
                orphans.extend(slot.outside);
                orphans.extend(slot.coplanar);
                buried.extend(slot.facet.vertices.into_iter().filter(|v| *v != idx && !rim.contains(v)));
            }
        }
        // Vertices inside the removed region may still lie on the new facets
        orphans.extend(buried.into_iter().sorted_unstable().dedup());

        for ridge in horizon {
            let mut vertices = ridge;
            vertices.push(idx);
            vertices.sort_unstable();

            let plane = plane_through(points, &vertices, interior)
                .filter(|plane| -plane.signed_distance(interior) > self.epsilon)
                .ok_or_else(|| {
                    ComputationError::unstable(
                        Stage::HullConstruction,
                        format!("cannot orient facet {vertices:?}"),
                    )
                })?;
            state.alloc(Facet { vertices, plane });
        }

        for orphan in orphans {
            state.assign(points, orphan, self.epsilon, true);
        }
        Ok(())
    }

    /// Check the hull is a closed pseudo-manifold containing every input point.
    fn validate(&self, points: &[Point], facets: &[Facet]) -> Result<(), ComputationError> {
        let mut ridge_count: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
        for facet in facets {
            for ridge in facet.ridges() {
                *ridge_count.entry(ridge).or_insert(0) += 1;
            }
        }
        if let Some((ridge, count)) = ridge_count.iter().find(|&(_, &count)| count != 2) {
            return Err(ComputationError::unstable(
                Stage::HullConstruction,
                format!("ridge {ridge:?} is shared by {count} facets"),
            ));
        }

        let limit = VALIDATION_SLACK * self.epsilon;
        for (idx, point) in points.iter().enumerate() {
            if let Some(facet) = facets
                .iter()
                .find(|f| f.plane.signed_distance(point) > limit)
            {
                return Err(ComputationError::unstable(
                    Stage::HullConstruction,
                    format!(
                        "point {idx} lies {:.3e} outside facet {:?}",
                        facet.plane.signed_distance(point),
                        facet.vertices
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// A facet under construction and the points waiting on it.
struct Slot {
    facet: Facet,
    /// Points more than ε beyond this facet and no farther beyond any other.
    outside: Vec<usize>,
    /// Non-vertex points within ε of this facet, re-checked when it is
    /// replaced.
    coplanar: Vec<usize>,
}

/// Facet storage with tombstones, a free list for O(1) slot reuse, and a
/// ridge index for adjacency.
#[derive(Default)]
struct FacetStore {
    slots: Vec<Option<Slot>>,
    free_list: Vec<usize>,
    /// Ridge → the facets sharing it (two once the hull is closed).
    ridges: FxHashMap<Vec<usize>, Vec<usize>>,
}

impl FacetStore {
    /// Allocate a facet slot, reusing from free list if available.
    fn alloc(&mut self, facet: Facet) -> usize {
        let idx = self.free_list.pop().unwrap_or_else(|| {
            self.slots.push(None);
            self.slots.len() - 1
        });
        for ridge in facet.ridges() {
            self.ridges.entry(ridge).or_default().push(idx);
        }
        self.slots[idx] = Some(Slot {
            facet,
            outside: Vec::new(),
            coplanar: Vec::new(),
        });
        idx
    }

    /// Remove a facet (tombstone), add its slot to the free list.
    fn free(&mut self, idx: usize) -> Option<Slot> {
        let slot = self.slots.get_mut(idx)?.take()?;
        for ridge in slot.facet.ridges() {
            if let Some(owners) = self.ridges.get_mut(&ridge) {
                owners.retain(|&f| f != idx);
                if owners.is_empty() {
                    self.ridges.remove(&ridge);
                }
            }
        }
        self.free_list.push(idx);
        Some(slot)
    }

    fn get(&self, idx: usize) -> Option<&Facet> {
        self.slots.get(idx)?.as_ref().map(|slot| &slot.facet)
    }

    /// Iterator over active facets with their indices.
    fn active(&self) -> impl Iterator<Item = (usize, &Facet)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|slot| (i, &slot.facet)))
    }

    /// Facets other than `idx` sharing `ridge`.
    fn neighbors(&self, idx: usize, ridge: &[usize]) -> impl Iterator<Item = usize> {
        self.ridges
            .get(ridge)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&f| f != idx)
    }

    /// Ridges between a facet in `visible` and one outside it, sorted.
    fn horizon(&self, visible: &FxHashSet<usize>) -> Vec<Vec<usize>> {
        visible
            .iter()
            .filter_map(|&face| self.get(face).map(|facet| (face, facet)))
            .flat_map(|(face, facet)| facet.ridges().map(move |ridge| (face, ridge)))
            .filter(|(face, ridge)| {
                self.neighbors(*face, ridge)
                    .any(|other| !visible.contains(&other))
            })
            .map(|(_, ridge)| ridge)
            .sorted_unstable()
            .collect()
    }

    /// Attach `points[idx]` to the facet it lies farthest beyond, skipping
    /// facets it is a vertex of. Past ε it becomes an outside point; within ε
    /// it is kept as coplanar if `keep_coplanar`. Returns whether it is
    /// outside.
    fn assign(&mut self, points: &[Point], idx: usize, epsilon: f64, keep_coplanar: bool) -> bool {
        let point = &points[idx];
        let best = self
            .active()
            .filter(|(_, f)| !f.contains_vertex(idx))
            .map(|(i, f)| (i, f.plane.signed_distance(point)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((face, distance)) = best else {
            return false;
        };
        let Some(slot) = self.slots[face].as_mut() else {
            return false;
        };

        if distance > epsilon {
            slot.outside.push(idx);
            true
        } else {
            if keep_coplanar && distance > -epsilon {
                slot.coplanar.push(idx);
            }
            false
        }
    }

    /// Drop every assignment and attach each point afresh, vertices included.
    /// Returns whether any point lies outside.
    fn reassign_all(&mut self, points: &[Point], epsilon: f64) -> bool {
        let mut is_vertex = vec![false; points.len()];
        for slot in self.slots.iter_mut().flatten() {
            slot.outside.clear();
            slot.coplanar.clear();
            for &v in &slot.facet.vertices {
                is_vertex[v] = true;
            }
        }

        let mut any_outside = false;
        for (idx, &vertex) in is_vertex.iter().enumerate() {
            any_outside |= self.assign(points, idx, epsilon, !vertex);
        }
        any_outside
    }

    /// Take the farthest outside point of the first facet that has any.
    fn pop_farthest(&mut self, points: &[Point]) -> Option<(usize, usize)> {
        let (face, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find_map(|(i, s)| s.as_mut().filter(|slot| !slot.outside.is_empty()).map(|slot| (i, slot)))?;
        let plane = &slot.facet.plane;
        let farthest = slot
            .outside
            .iter()
            .map(|&i| plane.signed_distance(&points[i]))
            .position_max_by(f64::total_cmp)?;
        Some((face, slot.outside.swap_remove(farthest)))
    }

    fn into_facets(self) -> Vec<Facet> {
        self.slots.into_iter().flatten().map(|slot| slot.facet).collect()
    }
}

/// Faces of dimension N-3 that the horizon does not bound exactly twice.
fn pinched_faces(horizon: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut count: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
    for ridge in horizon {
        for skip in 0..ridge.len() {
            *count.entry(without(ridge, skip)).or_insert(0) += 1;
        }
    }
    count
        .into_iter()
        .filter(|&(_, n)| n != 2)
        .map(|(face, _)| face)
        .sorted_unstable()
        .collect()
}

/// `items` with the element at `skip` removed.
fn without(items: &[usize], skip: usize) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != skip)
        .map(|(_, &v)| v)
        .collect()
}

/// Greedy initial simplex: N+1 point indices, or the rank reached if the
/// points are flat.
fn initial_simplex(points: &[Point], epsilon: f64) -> Result<Vec<usize>, usize> {
    let dim = points[0].len();

    // The lexicographically smallest point is always a hull vertex
    let anchor = (0..points.len())
        .min_by(|&a, &b| lexicographic(&points[a], &points[b]))
        .unwrap_or(0);
    let origin = &points[anchor];

    let mut chosen = vec![anchor];
    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(dim);

    let residual = |basis: &[DVector<f64>], p: &Point| {
        let mut r = p - origin;
        for b in basis {
            let c = b.dot(&r);
            r.axpy(-c, b, 1.0);
        }
        r
    };

    for _ in 0..dim {
        let Some(best) = points
            .iter()
            .map(|p| residual(&basis, p).norm())
            .position_max_by(f64::total_cmp)
        else {
            return Err(basis.len());
        };

        let r = residual(&basis, &points[best]);
        let height = r.norm();
        if height <= epsilon {
            return Err(basis.len());
        }
        basis.push(r / height);
        chosen.push(best);
    }

    Ok(chosen)
}

/// Oriented hyperplane through `points[vertices]` with `interior` on its
/// inner side, or `None` if the vertices are affinely dependent.
fn plane_through(points: &[Point], vertices: &[usize], interior: &Point) -> Option<HalfSpace> {
    let dim = interior.len();
    let p0 = &points[vertices[0]];

    let normal = if dim == 1 {
        DVector::from_element(1, 1.0)
    } else {
        let mut edges = DMatrix::from_fn(dim - 1, dim, |r, c| points[vertices[r + 1]][c] - p0[c]);
        // Direction is all that matters; keep the cofactors in range
        let magnitude = edges.amax();
        if magnitude == 0.0 {
            return None;
        }
        edges /= magnitude;

        // Generalized cross product: signed (N-1)-minors of the edge matrix
        DVector::from_fn(dim, |i, _| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign * edges.clone().remove_column(i).determinant()
        })
    };

    let offset = normal.dot(p0);
    let plane = HalfSpace::try_new(normal, offset)?;
    if plane.signed_distance(interior) > 0.0 {
        Some(HalfSpace {
            normal: -plane.normal,
            offset: -plane.offset,
        })
    } else {
        Some(plane)
    }
}

fn lexicographic(a: &Point, b: &Point) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}
