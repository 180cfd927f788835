//! Grouping labeled points into classes.
//!
//! The dimension N is inferred from the first point; every point must have N
//! finite coordinates and exactly N distinct labels must be present.

use std::hash::Hash;

use hashbrown::HashMap;
use tracing::debug;

use crate::error::ConfigError;
use crate::halfspace::Point;
use crate::tolerance::CoordinateScale;

/// One label and its points, in input order (duplicates kept).
#[derive(Clone, Debug, PartialEq)]
pub struct PointClass<L> {
    pub label: L,
    pub points: Vec<Point>,
}

impl<L> PointClass<L> {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Validated point classes, ordered by ascending label.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition<L> {
    dim: usize,
    classes: Vec<PointClass<L>>,
    scale: CoordinateScale,
}

impl<L> Partition<L> {
    /// Point dimension N (also the number of classes).
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn classes(&self) -> &[PointClass<L>] {
        &self.classes
    }

    #[must_use]
    pub fn into_classes(self) -> Vec<PointClass<L>> {
        self.classes
    }

    /// Extent and magnitude of all points together.
    #[inline]
    #[must_use]
    pub const fn coordinate_scale(&self) -> &CoordinateScale {
        &self.scale
    }

    /// Smallest class size.
    #[must_use]
    pub fn min_class_size(&self) -> usize {
        self.classes.iter().map(PointClass::len).min().unwrap_or(0)
    }
}

/// Group `points` by `labels`.
///
/// Fails if the inputs are empty or differ in length, if point dimensions are
/// inconsistent, if any coordinate is non-finite, or if the number of
/// distinct labels differs from the point dimension.
pub fn partition<P, L>(points: &[P], labels: &[L]) -> Result<Partition<L>, ConfigError>
where
    P: AsRef<[f64]>,
    L: Clone + Eq + Hash + Ord,
{
    if points.len() != labels.len() {
        return Err(ConfigError::LengthMismatch {
            points: points.len(),
            labels: labels.len(),
        });
    }
    let Some(first) = points.first() else {
        return Err(ConfigError::EmptyInput);
    };
    let dim = first.as_ref().len();
    if dim == 0 {
        return Err(ConfigError::ZeroDimension);
    }

    let mut groups: HashMap<&L, Vec<Point>> = HashMap::with_capacity(dim);

    for (index, (point, label)) in points.iter().zip(labels).enumerate() {
        let coords = point.as_ref();
        if coords.len() != dim {
            return Err(ConfigError::DimensionMismatch {
                index,
                expected: dim,
                actual: coords.len(),
            });
        }
        if let Some(axis) = coords.iter().position(|c| !c.is_finite()) {
            return Err(ConfigError::NonFiniteCoordinate { index, axis });
        }
        groups
            .entry(label)
            .or_default()
            .push(Point::from_column_slice(coords));
    }

    if groups.len() != dim {
        return Err(ConfigError::LabelCardinality {
            expected: dim,
            actual: groups.len(),
        });
    }

    let mut classes: Vec<PointClass<L>> = groups
        .into_iter()
        .map(|(label, points)| PointClass {
            label: label.clone(),
            points,
        })
        .collect();
    classes.sort_unstable_by(|a, b| a.label.cmp(&b.label));

    debug!(
        dim,
        points = points.len(),
        min_class = classes.iter().map(PointClass::len).min().unwrap_or(0),
        "partitioned points into classes"
    );

    Ok(Partition {
        dim,
        classes,
        scale: CoordinateScale::of_points(points.iter().map(|p| p.as_ref())),
    })
}
