//! Half-spaces and halfspace systems in ℝᴺ.
//!
//! - **Half-space**: region on one side of a hyperplane: `{ x : a·x ≤ b }`
//! - **H-representation**: an ordered list of half-spaces sharing one
//!   dimension; the polytope is their intersection.

use nalgebra::{DMatrix, DVector};

use crate::error::ConfigError;

/// A point in ℝᴺ.
pub type Point = DVector<f64>;

/// A half-space constraint: `a · x ≤ b`
///
/// - **Inside**: points where `a · x < b` (strictly satisfies constraint)
/// - **Boundary**: points where `a · x = b` (the hyperplane itself)
/// - **Outside**: points where `a · x > b` (violates constraint)
///
/// The normal points toward the forbidden region and is kept at unit length,
/// so [`HalfSpace::signed_distance`] is a Euclidean distance.
#[derive(Clone, Debug, PartialEq)]
pub struct HalfSpace {
    /// Unit normal vector pointing toward the forbidden region.
    pub normal: DVector<f64>,
    /// Signed distance from origin to the hyperplane.
    pub offset: f64,
}

impl HalfSpace {
    /// Create a half-space, normalizing the input normal vector.
    ///
    /// # Panics
    /// Panics if the normal vector is zero or not finite.
    #[must_use]
    pub fn new(normal: DVector<f64>, offset: f64) -> Self {
        Self::try_new(normal, offset).expect("normal vector must be non-zero and finite")
    }

    /// Create from an already-normalized normal (debug-asserts unit length).
    #[must_use]
    pub fn new_normalized(normal: DVector<f64>, offset: f64) -> Self {
        debug_assert!((normal.norm() - 1.0).abs() < 1e-6);
        Self { normal, offset }
    }

    /// Try to create, returning `None` if the normal is zero or not finite.
    #[must_use]
    pub fn try_new(normal: DVector<f64>, offset: f64) -> Option<Self> {
        let len = normal.norm();
        (len > 0.0 && len.is_finite() && offset.is_finite()).then(|| Self {
            normal: normal / len,
            offset: offset / len,
        })
    }

    /// Ambient dimension.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.normal.len()
    }

    /// Classify a point: Inside (satisfies), On (boundary), or Outside
    /// (violates).
    #[must_use]
    pub fn classify(&self, point: &DVector<f64>, epsilon: f64) -> Classification {
        let d = self.signed_distance(point);
        if d < -epsilon {
            Classification::Inside
        } else if d > epsilon {
            Classification::Outside
        } else {
            Classification::On
        }
    }

    /// Signed distance: negative = inside, zero = on boundary, positive =
    /// outside.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: &DVector<f64>) -> f64 {
        self.normal.dot(point) - self.offset
    }

    /// The same half-space in coordinates where `origin` is the new origin.
    #[must_use]
    pub fn translated(&self, origin: &DVector<f64>) -> Self {
        Self {
            normal: self.normal.clone(),
            offset: self.offset - self.normal.dot(origin),
        }
    }
}

/// Classification of a point relative to a half-space boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Strictly satisfies the half-space constraint: `a·x < b - ε`
    Inside,

    /// On the boundary within tolerance: `|a·x - b| ≤ ε`
    On,

    /// Violates the half-space constraint: `a·x > b + ε`
    Outside,
}

/// An ordered system of half-spaces of one dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct HRepresentation {
    dim: usize,
    halfspaces: Vec<HalfSpace>,
}

impl HRepresentation {
    /// An empty system (all of ℝᴺ).
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self {
            dim,
            halfspaces: Vec::new(),
        }
    }

    /// Build a system, checking every half-space has dimension `dim`.
    pub fn from_halfspaces(
        dim: usize,
        halfspaces: impl IntoIterator<Item = HalfSpace>,
    ) -> Result<Self, ConfigError> {
        let mut rep = Self::new(dim);
        for hs in halfspaces {
            rep.push(hs)?;
        }
        Ok(rep)
    }

    /// A system from rows already known to have dimension `dim`.
    pub(crate) fn from_rows(dim: usize, halfspaces: Vec<HalfSpace>) -> Self {
        debug_assert!(halfspaces.iter().all(|hs| hs.dim() == dim));
        Self { dim, halfspaces }
    }

    /// Append a half-space.
    pub fn push(&mut self, halfspace: HalfSpace) -> Result<(), ConfigError> {
        if halfspace.dim() != self.dim {
            return Err(ConfigError::DimensionMismatch {
                index: self.halfspaces.len(),
                expected: self.dim,
                actual: halfspace.dim(),
            });
        }
        self.halfspaces.push(halfspace);
        Ok(())
    }

    /// The axis-aligned box `[min, max]`.
    ///
    /// # Panics
    /// Panics if `min` and `max` differ in dimension.
    #[must_use]
    pub fn bounding_box(min: &DVector<f64>, max: &DVector<f64>) -> Self {
        assert_eq!(min.len(), max.len(), "box corners differ in dimension");
        let dim = min.len();
        let halfspaces = (0..dim)
            .flat_map(|axis| {
                let unit = DVector::from_fn(dim, |i, _| if i == axis { 1.0 } else { 0.0 });
                [
                    HalfSpace::new_normalized(unit.clone(), max[axis]),
                    HalfSpace::new_normalized(-unit, -min[axis]),
                ]
            })
            .collect();
        Self { dim, halfspaces }
    }

    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.halfspaces.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.halfspaces.is_empty()
    }

    #[must_use]
    pub fn halfspaces(&self) -> &[HalfSpace] {
        &self.halfspaces
    }

    pub fn iter(&self) -> impl Iterator<Item = &HalfSpace> {
        self.halfspaces.iter()
    }

    /// Append every half-space of `other`.
    pub fn extend_from(&mut self, other: &Self) -> Result<(), ConfigError> {
        if other.dim != self.dim {
            return Err(ConfigError::DimensionMismatch {
                index: self.halfspaces.len(),
                expected: self.dim,
                actual: other.dim,
            });
        }
        self.halfspaces.extend_from_slice(&other.halfspaces);
        Ok(())
    }

    /// Returns `true` if `point` violates no half-space by more than `epsilon`.
    #[must_use]
    pub fn contains(&self, point: &DVector<f64>, epsilon: f64) -> bool {
        self.halfspaces
            .iter()
            .all(|hs| hs.signed_distance(point) <= epsilon)
    }

    /// Smallest slack `b - a·x` over all rows (the inscribed margin at `point`).
    #[must_use]
    pub fn margin(&self, point: &DVector<f64>) -> f64 {
        self.halfspaces
            .iter()
            .map(|hs| -hs.signed_distance(point))
            .fold(f64::INFINITY, f64::min)
    }

    /// The system with `origin` moved to zero.
    #[must_use]
    pub fn translated(&self, origin: &DVector<f64>) -> Self {
        Self {
            dim: self.dim,
            halfspaces: self.halfspaces.iter().map(|hs| hs.translated(origin)).collect(),
        }
    }

    /// Dense `(A, b)` form of the system.
    #[must_use]
    pub fn to_matrix(&self) -> (DMatrix<f64>, DVector<f64>) {
        let a = DMatrix::from_fn(self.len(), self.dim, |r, c| self.halfspaces[r].normal[c]);
        let b = DVector::from_fn(self.len(), |r, _| self.halfspaces[r].offset);
        (a, b)
    }
}
