use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{
    BSplineCurve, Curve3, DEGREE, Point3, arc_length_parameters, arc_length_to_natural,
    blend_parameters, compute_lengths, natural_parameters, natural_to_arc_length,
    remap_to_domain, unclamped_knot_vector,
};

fn wavy_curve() -> BSplineCurve {
    BSplineCurve::clamped(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 3.0, 0.0),
        Point3::new(2.0, -1.0, 1.0),
        Point3::new(4.0, 2.0, -1.0),
        Point3::new(5.0, 0.0, 0.0),
        Point3::new(9.0, 0.5, 0.0),
    ])
    .expect("valid curve")
}

#[test]
fn natural_parameters_hit_both_bounds_exactly() {
    let params = natural_parameters(37, 0.3, 0.7).expect("params");
    assert_eq!(params[0], 0.3);
    assert_eq!(params[36], 0.7);
    assert!(params.windows(2).all(|w| w[0] < w[1]));
    assert!(natural_parameters(1, 0.0, 1.0).is_err());
}

#[test]
fn lengths_are_monotonic_for_random_curves() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let count = rng.random_range(4..12);
        let points = (0..count)
            .map(|_| {
                Point3::new(
                    rng.random_range(-5.0..5.0),
                    rng.random_range(-5.0..5.0),
                    rng.random_range(-5.0..5.0),
                )
            })
            .collect();
        let curve = BSplineCurve::clamped(points).expect("valid curve");
        let (lengths, points) = compute_lengths(&curve, 64).expect("lengths");
        assert_eq!(lengths[0], 0.0);
        assert_eq!(points.len(), 64);
        for i in 0..lengths.len() {
            for j in i..lengths.len() {
                assert!(lengths[i] <= lengths[j]);
            }
        }
    }
}

#[test]
fn natural_and_arc_length_round_trip() {
    let (lengths, _) = compute_lengths(&wavy_curve(), 101).expect("lengths");
    for i in 0..=50 {
        let t = f64::from(i) / 50.0;
        let back = arc_length_to_natural(natural_to_arc_length(t, &lengths), &lengths);
        assert!((back - t).abs() < 1e-9, "t={t} back={back}");
    }
}

#[test]
fn boundary_fractions_are_returned_unchanged() {
    let (lengths, _) = compute_lengths(&wavy_curve(), 11).expect("lengths");
    assert_eq!(arc_length_to_natural(0.0, &lengths), 0.0);
    assert_eq!(arc_length_to_natural(1.0, &lengths), 1.0);
    assert_eq!(natural_to_arc_length(0.0, &lengths), 0.0);
    assert_eq!(natural_to_arc_length(1.0, &lengths), 1.0);
}

#[test]
fn arc_length_parameters_space_points_evenly() {
    let curve = BSplineCurve::clamped(
        [0.0, 1.0, 1.5, 6.0, 8.0]
            .iter()
            .map(|&x| Point3::new(x, 0.0, 0.0))
            .collect(),
    )
    .expect("valid curve");
    let (lengths, _) = compute_lengths(&curve, 401).expect("lengths");
    let total = lengths[400];
    let params = arc_length_parameters(&lengths).expect("arc params");
    assert_eq!(params[0], 0.0);
    assert_eq!(params[400], 1.0);

    let step = total / 400.0;
    for w in params.windows(2) {
        let gap = curve.point_at(w[1]).distance_to(curve.point_at(w[0]));
        assert!((gap - step).abs() < 1e-3 * total, "gap {gap} step {step}");
    }
}

#[test]
fn blended_parameters_keep_exact_bounds() {
    let closed = BSplineCurve::new(
        DEGREE,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ],
        unclamped_knot_vector(6, DEGREE),
    )
    .expect("valid closed curve");
    let (lower, upper) = closed.domain();
    let natural = natural_parameters(23, lower, upper).expect("natural");
    let (lengths, _) = compute_lengths(&closed, 23).expect("lengths");
    let arc: Vec<f64> = arc_length_parameters(&lengths)
        .expect("arc params")
        .into_iter()
        .map(|a| remap_to_domain(a, lower, upper))
        .collect();

    for blend in [0.0, 0.25, 0.5, 0.9, 1.0] {
        let blended = blend_parameters(&natural, &arc, blend, lower, upper);
        assert_eq!(blended[0], lower);
        assert_eq!(blended[22], upper);
        assert!(blended.windows(2).all(|w| w[0] <= w[1]));
    }
}
