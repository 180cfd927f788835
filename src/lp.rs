//! # Inscribed-Margin Linear Program
//!
//! Finds the Chebyshev center of a halfspace system `A x ≤ b` with unit-length
//! rows:
//!
//! ```text
//! maximize t   subject to   A x + t·1 ≤ b,   x ∈ ℝᴺ, t ∈ ℝ
//! ```
//!
//! The optimum `t*` is the radius of the largest ball inside the polytope and
//! `x*` its center. `t* > 0` means the polytope has a non-empty interior.
//!
//! ## Method
//!
//! A dense primal simplex on the condensed tableau, sized for systems of a
//! few hundred rows and a handful of columns:
//!
//! 1. **Centering**: the system is moved to the least-squares point of its
//!    hyperplanes, so offsets stay on the scale of the polytope however far
//!    it sits from the origin.
//! 2. **Standard form**: free variables are split as `x = x⁺ − x⁻`, and `t`
//!    is shifted by `T = max(0, −min b)` so every right-hand side is
//!    non-negative. The slack basis is then feasible and no phase one is
//!    needed.
//! 3. **Pivoting**: Bland's rule (smallest entering index, ratio ties broken
//!    by smallest leaving index) so degenerate vertices cannot cycle.
//! 4. **Polish**: the reported margin is recomputed from the system as
//!    `min_i (b_i − a_i·x*)` rather than read off the tableau.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ComputationError, ConfigError};
use crate::halfspace::{HRepresentation, Point};

/// Simplex solver limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LpOptions {
    /// Pivot limit before reporting non-convergence.
    pub max_iter: usize,
    /// Pivot and reduced-cost tolerance on the normalized tableau.
    pub tol: f64,
}

impl Default for LpOptions {
    fn default() -> Self {
        Self {
            max_iter: 50_000,
            tol: 1e-12,
        }
    }
}

impl LpOptions {
    #[must_use]
    pub const fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub const fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(ConfigError::InvalidTolerance {
                name: "lp.tol",
                value: self.tol,
            });
        }
        Ok(())
    }
}

/// Whether the optimal margin clears the interior threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LpStatus {
    /// `point` is strictly inside every halfspace by more than the threshold.
    Interior,
    /// The system is empty or has no interior (boundary contact only).
    EmptyInterior,
}

/// Optimal inscribed margin and its center.
#[derive(Clone, Debug, PartialEq)]
pub struct LpResult {
    /// `t*`: the smallest slack of `point` over all rows. Negative when the
    /// system is infeasible.
    pub margin: f64,
    /// `x*`
    pub point: Point,
    pub status: LpStatus,
    /// Simplex pivots performed.
    pub iterations: usize,
}

impl LpResult {
    #[inline]
    #[must_use]
    pub fn is_interior(&self) -> bool {
        self.status == LpStatus::Interior
    }
}

/// Solve the inscribed-margin LP for `system`.
///
/// `interior_margin` is the absolute threshold `t*` must exceed for the
/// result to be [`LpStatus::Interior`].
///
/// # Errors
/// [`ComputationError::LpUnbounded`] if the margin can grow without limit
/// (including an empty system), [`ComputationError::LpNonConvergence`] if
/// `options.max_iter` pivots are not enough.
pub fn chebyshev_center(
    system: &HRepresentation,
    interior_margin: f64,
    options: &LpOptions,
) -> Result<LpResult, ComputationError> {
    if system.is_empty() {
        return Err(ComputationError::LpUnbounded);
    }

    let dim = system.dim();
    let anchor = anchor_point(system);
    let (a, b) = system.translated(&anchor).to_matrix();
    let shift = (-b.min()).max(0.0);

    let mut tableau = Tableau::new(&a, &b, shift);
    let iterations = tableau.solve(options)?;

    let values = tableau.primal_values();
    let point = DVector::from_fn(dim, |k, _| values[k] - values[dim + k]) + &anchor;
    let margin = system.margin(&point);

    let status = if margin > interior_margin {
        LpStatus::Interior
    } else {
        LpStatus::EmptyInterior
    };

    debug!(
        rows = system.len(),
        dim,
        iterations,
        margin,
        tableau_margin = values[2 * dim] - shift,
        ?status,
        "solved inscribed-margin LP"
    );

    Ok(LpResult {
        margin,
        point,
        status,
        iterations,
    })
}

/// Least-squares point of the row hyperplanes, inside or near any bounded
/// system. Solving around it keeps the offsets as small as the polytope,
/// wherever it sits. Falls back to the origin for rank-deficient rows.
fn anchor_point(system: &HRepresentation) -> DVector<f64> {
    let (a, b) = system.to_matrix();
    let at = a.transpose();
    (&at * &a)
        .cholesky()
        .map_or_else(|| DVector::zeros(system.dim()), |c| c.solve(&(&at * &b)))
}

/// Condensed simplex tableau for `max c·y` s.t. `M y ≤ rhs`, `y ≥ 0`.
///
/// Row `i` reads `basic[i] = rhs[i] − Σⱼ coef[i, j] · nonbasic[j]` and the
/// objective reads `value + Σⱼ cost[j] · nonbasic[j]`. Variables are labelled
/// `0..n` for structural columns and `n..n+m` for slacks.
struct Tableau {
    coef: DMatrix<f64>,
    rhs: DVector<f64>,
    cost: DVector<f64>,
    value: f64,
    basic: Vec<usize>,
    nonbasic: Vec<usize>,
}

impl Tableau {
    /// Columns are `[x⁺ | x⁻ | t']` with `t = t' − shift`.
    fn new(a: &DMatrix<f64>, b: &DVector<f64>, shift: f64) -> Self {
        let (rows, dim) = a.shape();
        let cols = 2 * dim + 1;

        let coef = DMatrix::from_fn(rows, cols, |r, c| match c {
            c if c < dim => a[(r, c)],
            c if c < 2 * dim => -a[(r, c - dim)],
            _ => 1.0,
        });
        let rhs = b.add_scalar(shift);
        let cost = DVector::from_fn(cols, |c, _| if c == cols - 1 { 1.0 } else { 0.0 });

        Self {
            coef,
            rhs,
            cost,
            value: 0.0,
            basic: (cols..cols + rows).collect(),
            nonbasic: (0..cols).collect(),
        }
    }

    /// Pivot to optimality, returning the number of pivots.
    fn solve(&mut self, options: &LpOptions) -> Result<usize, ComputationError> {
        let mut iterations = 0;
        while let Some(entering) = self.entering_column(options.tol) {
            if iterations >= options.max_iter {
                return Err(ComputationError::LpNonConvergence { iterations });
            }
            let leaving = self
                .leaving_row(entering, options.tol)
                .ok_or(ComputationError::LpUnbounded)?;
            self.pivot(leaving, entering);
            iterations += 1;
        }

        trace!(iterations, objective = self.value, "simplex reached optimum");
        Ok(iterations)
    }

    /// Bland: the improving column with the smallest variable label.
    fn entering_column(&self, tol: f64) -> Option<usize> {
        (0..self.nonbasic.len())
            .filter(|&j| self.cost[j] > tol)
            .min_by_key(|&j| self.nonbasic[j])
    }

    /// Minimum-ratio row, ties broken by the smallest basic label.
    fn leaving_row(&self, entering: usize, tol: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.basic.len() {
            let pivot = self.coef[(i, entering)];
            if pivot <= tol {
                continue;
            }
            let ratio = self.rhs[i] / pivot;
            best = match best {
                Some((r, best_ratio))
                    if ratio > best_ratio + tol
                        || (ratio >= best_ratio - tol && self.basic[i] > self.basic[r]) =>
                {
                    Some((r, best_ratio))
                }
                _ => Some((i, ratio)),
            };
        }
        best.map(|(row, _)| row)
    }

    /// Exchange `basic[row]` and `nonbasic[col]`.
    fn pivot(&mut self, row: usize, col: usize) {
        let (rows, cols) = self.coef.shape();
        let p = self.coef[(row, col)];

        // New pivot row
        self.rhs[row] /= p;
        for j in 0..cols {
            self.coef[(row, j)] = if j == col { 1.0 / p } else { self.coef[(row, j)] / p };
        }

        for i in (0..rows).filter(|&i| i != row) {
            let factor = self.coef[(i, col)];
            if factor == 0.0 {
                continue;
            }
            self.rhs[i] -= factor * self.rhs[row];
            for j in 0..cols {
                self.coef[(i, j)] = if j == col {
                    -factor / p
                } else {
                    self.coef[(i, j)] - factor * self.coef[(row, j)]
                };
            }
        }

        let factor = self.cost[col];
        self.value += factor * self.rhs[row];
        for j in 0..cols {
            self.cost[j] = if j == col {
                -factor / p
            } else {
                self.cost[j] - factor * self.coef[(row, j)]
            };
        }

        std::mem::swap(&mut self.basic[row], &mut self.nonbasic[col]);
    }

    /// Values of the structural variables at the current basis.
    fn primal_values(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.nonbasic.len()];
        for (i, &label) in self.basic.iter().enumerate() {
            if let Some(v) = values.get_mut(label) {
                // Clamp round-off below the y ≥ 0 bound
                *v = self.rhs[i].max(0.0);
            }
        }
        values
    }
}
