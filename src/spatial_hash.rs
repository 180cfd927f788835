//! Grid-based spatial hash for O(1) expected-time duplicate detection in ℝᴺ.
//!
//! Divides space into a grid of cells several tolerances wide. To check if a
//! point is a duplicate:
//! 1. Compute which cell the point falls into
//! 2. Collect the axes on which the point lies within tolerance of a cell wall
//! 3. Probe the home cell plus the neighbors across every subset of those walls
//!
//! A point far from every wall probes only its own cell, so the 3ᴺ
//! neighborhood of a naive grid is never enumerated.

use itertools::Itertools;
use rustc_hash::FxHashMap;

/// Cell width in units of the tolerance.
const CELL_WIDTH: f64 = 8.0;

/// Grid-based spatial hash for efficient duplicate point detection.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cells: FxHashMap<Vec<i64>, Vec<Vec<f64>>>,
    cell_size: f64,
    tolerance: f64,
}

impl SpatialHash {
    /// Create a new spatial hash with the given tolerance.
    ///
    /// Points within `tolerance` distance of each other are considered duplicates.
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        let tolerance = tolerance.max(f64::MIN_POSITIVE);
        Self {
            cells: FxHashMap::default(),
            cell_size: tolerance * CELL_WIDTH,
            tolerance,
        }
    }

    /// Map a point to its grid cell indices.
    ///
    /// The grid is shifted by half a cell so that lattice-aligned inputs
    /// (integers, zeros) sit mid-cell rather than on a wall.
    #[inline]
    fn cell_coords(&self, p: &[f64]) -> Vec<i64> {
        #[allow(clippy::cast_possible_truncation)]
        let discretize = |v: f64| (v / self.cell_size + 0.5).floor() as i64;
        p.iter().map(|&v| discretize(v)).collect()
    }

    /// Axes on which `p` lies within tolerance of a wall of its cell, paired
    /// with the step toward the neighbor across that wall.
    fn near_walls(&self, p: &[f64], cell: &[i64]) -> Vec<(usize, i64)> {
        p.iter()
            .zip(cell)
            .enumerate()
            .filter_map(|(axis, (&v, &c))| {
                #[allow(clippy::cast_precision_loss)]
                let lower = (c as f64 - 0.5) * self.cell_size;
                let offset = v - lower;
                if offset < self.tolerance {
                    Some((axis, -1))
                } else if self.cell_size - offset < self.tolerance {
                    Some((axis, 1))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Check if the given point is within tolerance of any existing point.
    #[must_use]
    pub fn is_duplicate(&self, point: &[f64]) -> bool {
        let home = self.cell_coords(point);
        let near = self.near_walls(point, &home);

        near.iter().powerset().any(|steps| {
            let mut cell = home.clone();
            for &&(axis, step) in &steps {
                cell[axis] = cell[axis].saturating_add(step);
            }
            self.cells.get(&cell).is_some_and(|pts| {
                pts.iter().any(|p| distance(p, point) < self.tolerance)
            })
        })
    }

    /// Insert a point into the hash (does not check for duplicates).
    pub fn insert(&mut self, point: &[f64]) {
        self.cells
            .entry(self.cell_coords(point))
            .or_default()
            .push(point.to_vec());
    }

    /// Insert only if not a duplicate. Returns true if inserted.
    pub fn insert_if_unique(&mut self, point: &[f64]) -> bool {
        if self.is_duplicate(point) {
            false
        } else {
            self.insert(point);
            true
        }
    }

    /// Number of stored points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[inline]
fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
