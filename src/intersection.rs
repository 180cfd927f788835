//! Stacking halfspace systems.
//!
//! The intersection of polytopes given by `A_k x ≤ b_k` is the polytope of
//! the vertically concatenated system. No redundancy is removed here.

use tracing::debug;

use crate::error::ConfigError;
use crate::halfspace::HRepresentation;

/// Concatenate `reps` into one system, in order.
///
/// Fails only if the systems differ in dimension. An empty slice yields an
/// empty zero-dimensional system.
pub fn intersect(reps: &[HRepresentation]) -> Result<HRepresentation, ConfigError> {
    let Some(first) = reps.first() else {
        return Ok(HRepresentation::new(0));
    };

    let dim = first.dim();
    let mut stacked = HRepresentation::new(dim);
    for (index, rep) in reps.iter().enumerate() {
        if rep.dim() != dim {
            return Err(ConfigError::DimensionMismatch {
                index,
                expected: dim,
                actual: rep.dim(),
            });
        }
        stacked.extend_from(rep)?;
    }

    debug!(
        systems = reps.len(),
        rows = stacked.len(),
        dim,
        "stacked halfspace systems"
    );
    Ok(stacked)
}
