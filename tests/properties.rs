//! Property tests for the separability score.

use hull_separability::{Score, separability_score};
use nalgebra::{Rotation3, Vector3};
use proptest::prelude::*;

type Labeled = Vec<([f64; 2], u8)>;
type Labeled3 = Vec<([f64; 3], u8)>;

/// A class of 4 to 10 points in the unit square.
fn cloud() -> impl Strategy<Value = Vec<[f64; 2]>> {
    prop::collection::vec((0.0..1.0_f64, 0.0..1.0_f64).prop_map(|(x, y)| [x, y]), 4..10)
}

/// Two overlapping classes, class 1 shifted by up to half a unit.
fn two_classes() -> impl Strategy<Value = Labeled> {
    (cloud(), cloud(), 0.0..0.5_f64).prop_map(|(a, b, shift)| {
        a.into_iter()
            .map(|p| (p, 0))
            .chain(b.into_iter().map(|p| ([p[0] + shift, p[1]], 1)))
            .collect()
    })
}

/// A class of 5 to 12 points in the unit cube.
fn cloud3() -> impl Strategy<Value = Vec<[f64; 3]>> {
    prop::collection::vec(
        (0.0..1.0_f64, 0.0..1.0_f64, 0.0..1.0_f64).prop_map(|(x, y, z)| [x, y, z]),
        5..12,
    )
}

/// Three overlapping classes in 3-D, class `c` shifted by `c` times up to
/// 0.2 along x.
fn three_classes() -> impl Strategy<Value = Labeled3> {
    (cloud3(), cloud3(), cloud3(), 0.0..0.2_f64).prop_map(|(a, b, c, shift)| {
        [a, b, c]
            .into_iter()
            .zip(0_u8..)
            .flat_map(|(class, label)| {
                let dx = shift * f64::from(label);
                class.into_iter().map(move |[x, y, z]| ([x + dx, y, z], label))
            })
            .collect()
    })
}

fn score<const N: usize>(labeled: &[([f64; N], u8)], f_k: f64) -> Score {
    let (points, labels): (Vec<[f64; N]>, Vec<u8>) = labeled.iter().copied().unzip();
    separability_score(&points, &labels, f_k).expect("score")
}

/// Shrink class 0 towards its centroid by `factor`.
fn shrink_first_class<const N: usize>(
    labeled: &[([f64; N], u8)],
    factor: f64,
) -> Vec<([f64; N], u8)> {
    let class: Vec<[f64; N]> = labeled.iter().filter(|(_, l)| *l == 0).map(|(p, _)| *p).collect();
    #[allow(clippy::cast_precision_loss)]
    let n = class.len() as f64;
    let centroid: [f64; N] = std::array::from_fn(|k| class.iter().map(|p| p[k]).sum::<f64>() / n);

    labeled
        .iter()
        .map(|&(p, l)| {
            if l == 0 {
                (std::array::from_fn(|k| centroid[k] + factor * (p[k] - centroid[k])), l)
            } else {
                (p, l)
            }
        })
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-7 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_permutation_invariant(
        (original, shuffled) in two_classes()
            .prop_flat_map(|labeled| (Just(labeled.clone()), Just(labeled).prop_shuffle()))
    ) {
        let a = score(&original, 0.0);
        let b = score(&shuffled, 0.0);
        prop_assert!(close(a.value, b.value), "{} != {}", a.value, b.value);
    }

    #[test]
    fn prop_rigid_motion_invariant(
        labeled in two_classes(),
        theta in 0.0..std::f64::consts::TAU,
        tx in -5.0..5.0_f64,
        ty in -5.0..5.0_f64,
    ) {
        let (sin, cos) = theta.sin_cos();
        let moved: Labeled = labeled
            .iter()
            .map(|&([x, y], l)| ([cos * x - sin * y + tx, sin * x + cos * y + ty], l))
            .collect();

        let a = score(&labeled, 0.0);
        let b = score(&moved, 0.0);
        prop_assert!(
            (a.value - b.value).abs() <= 1e-6,
            "{} != {} after rotation {theta} and shift ({tx}, {ty})",
            a.value,
            b.value
        );
    }

    #[test]
    fn prop_value_is_scaled_volume(labeled in two_classes(), f_k in -10.0..10.0_f64) {
        let s = score(&labeled, f_k);
        if s.degenerate.is_some() {
            prop_assert!(s.value.abs() < f64::EPSILON);
        } else {
            prop_assert!(close(s.value, s.volume * (1.0 - f_k)));
        }

        let one = score(&labeled, 1.0);
        prop_assert!(one.value.abs() < 1e-12);
    }

    #[test]
    fn prop_shrinking_never_grows_volume(labeled in two_classes(), factor in 0.05..1.0_f64) {
        let shrunk = shrink_first_class(&labeled, factor);

        let before = score(&labeled, 0.0).volume;
        let after = score(&shrunk, 0.0).volume;
        prop_assert!(after <= before + 1e-9, "shrinking by {factor}: {before} -> {after}");
    }

    #[test]
    fn prop_small_class_scores_zero(
        big in cloud(),
        small in prop::collection::vec((0.0..1.0_f64, 0.0..1.0_f64), 1..3),
        f_k in -10.0..10.0_f64,
    ) {
        let labeled: Labeled = big
            .into_iter()
            .map(|p| (p, 0))
            .chain(small.into_iter().map(|(x, y)| ([x, y], 1)))
            .collect();
        let s = score(&labeled, f_k);
        prop_assert!(s.degenerate.is_some());
        prop_assert!(s.value.abs() < f64::EPSILON);
    }

    #[test]
    fn prop_rigid_motion_invariant_3d(
        labeled in three_classes(),
        (roll, pitch, yaw) in (
            0.0..std::f64::consts::TAU,
            0.0..std::f64::consts::TAU,
            0.0..std::f64::consts::TAU,
        ),
        shift in prop::array::uniform3(-50.0..50.0_f64),
    ) {
        let rotation = Rotation3::from_euler_angles(roll, pitch, yaw);
        let offset = Vector3::from(shift);
        let moved: Labeled3 = labeled
            .iter()
            .map(|&(p, l)| ((rotation * Vector3::from(p) + offset).into(), l))
            .collect();

        let a = score(&labeled, 0.0);
        let b = score(&moved, 0.0);
        prop_assert!(
            (a.volume - b.volume).abs() <= 1e-6,
            "{} != {} after rotation ({roll}, {pitch}, {yaw}) and shift {shift:?}",
            a.volume,
            b.volume
        );
    }

    #[test]
    fn prop_shrinking_never_grows_volume_3d(labeled in three_classes(), factor in 0.05..1.0_f64) {
        let shrunk = shrink_first_class(&labeled, factor);

        let before = score(&labeled, 0.0).volume;
        let after = score(&shrunk, 0.0).volume;
        prop_assert!(after <= before + 1e-9, "shrinking by {factor}: {before} -> {after}");
    }
}
