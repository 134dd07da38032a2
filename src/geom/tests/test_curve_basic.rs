use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{
    BSplineCurve, Curve3, CurveError, DEGREE, Point3, Tolerance, Vec3, clamped_knot_vector,
    unclamped_knot_vector,
};

fn random_points(rng: &mut StdRng, count: usize) -> Vec<Point3> {
    (0..count)
        .map(|_| {
            Point3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            )
        })
        .collect()
}

#[test]
fn clamped_knot_vector_is_valid_for_any_point_count() {
    for count in 3..40 {
        let knots = clamped_knot_vector(count, DEGREE);
        assert_eq!(knots.len(), count + 5);
        assert!(knots.windows(2).all(|w| w[0] <= w[1]));
        assert!(knots[..4].iter().all(|&k| k == knots[0]));
        assert!(knots[knots.len() - 4..].iter().all(|&k| k == knots[knots.len() - 1]));
        assert_eq!(knots[0], 0.0);
        assert_eq!(knots[knots.len() - 1], 1.0);
    }
}

#[test]
fn unclamped_knot_vector_is_uniform() {
    let knots = unclamped_knot_vector(8, DEGREE);
    assert_eq!(knots.len(), 13);
    for (i, k) in knots.iter().enumerate() {
        assert!((k - i as f64 / 12.0).abs() < 1e-15);
    }
}

#[test]
fn clamped_curve_interpolates_end_points() {
    let mut rng = StdRng::seed_from_u64(11);
    let tol = Tolerance::DEFAULT;
    for count in 4..16 {
        let points = random_points(&mut rng, count);
        let curve = BSplineCurve::clamped(points.clone()).expect("valid curve");
        let (lower, upper) = curve.domain();
        let start = curve.evaluate(lower).expect("start");
        let end = curve.evaluate(upper).expect("end");
        assert!(tol.approx_eq_point3(start, points[0]), "{start:?}");
        assert!(tol.approx_eq_point3(end, points[count - 1]), "{end:?}");
    }
}

#[test]
fn evaluation_outside_domain_fails() {
    let curve = BSplineCurve::clamped(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(3.0, 1.0, 0.0),
    ])
    .expect("valid curve");

    assert!(matches!(
        curve.evaluate(1.5),
        Err(CurveError::ParameterOutOfDomain { .. })
    ));
    assert!(curve.derivative(1, -0.1).is_err());
    assert!(curve.evaluate(f64::NAN).is_err());
}

#[test]
fn constructor_rejects_inconsistent_input() {
    let points = vec![Point3::ORIGIN; 4];
    assert_eq!(
        BSplineCurve::new(3, points[..3].to_vec(), vec![0.0; 7]),
        Err(CurveError::TooFewControlPoints {
            degree: 3,
            required: 4,
            actual: 3
        })
    );
    assert_eq!(
        BSplineCurve::new(3, points.clone(), vec![0.0; 7]),
        Err(CurveError::KnotCountMismatch {
            expected: 8,
            actual: 7
        })
    );
    let decreasing = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.5];
    assert_eq!(
        BSplineCurve::new(3, points, decreasing),
        Err(CurveError::DecreasingKnots)
    );
}

#[test]
fn first_derivative_of_bezier_segment_matches_hull() {
    // Four points with a clamped knot vector form a single cubic Bezier segment.
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 2.0, 0.0),
        Point3::new(3.0, 2.0, 1.0),
        Point3::new(4.0, 0.0, 1.0),
    ];
    let curve = BSplineCurve::clamped(points.clone()).expect("valid curve");
    let tol = Tolerance::DEFAULT;

    let d0 = curve.derivative(1, 0.0).expect("start derivative");
    let d1 = curve.derivative(1, 1.0).expect("end derivative");
    assert!(tol.approx_eq_vec3(d0, (points[1] - points[0]) * 3.0));
    assert!(tol.approx_eq_vec3(d1, (points[3] - points[2]) * 3.0));

    let dd0 = curve.derivative(2, 0.0).expect("second derivative");
    let expected = ((points[2] - points[1]) - (points[1] - points[0])) * 6.0;
    assert!(tol.approx_eq_vec3(dd0, expected));
}

#[test]
fn derivatives_match_finite_differences() {
    let mut rng = StdRng::seed_from_u64(3);
    let curve = BSplineCurve::clamped(random_points(&mut rng, 9)).expect("valid curve");
    let h = 1e-6;
    for i in 1..20 {
        let t = f64::from(i) / 20.0;
        let fd = (curve.point_at(t + h) - curve.point_at(t - h)) / (2.0 * h);
        let d = curve.derivative(1, t).expect("derivative");
        assert!((fd - d).length() < 1e-4 * d.length().max(1.0), "t={t}");

        let fd2 = (curve.derivative(1, t + h).expect("d1") - curve.derivative(1, t - h).expect("d1"))
            / (2.0 * h);
        let d2 = curve.derivative(2, t).expect("second derivative");
        assert!((fd2 - d2).length() < 1e-3 * d2.length().max(1.0), "t={t}");
    }
}

#[test]
fn derivatives_beyond_degree_vanish() {
    let mut rng = StdRng::seed_from_u64(5);
    let curve = BSplineCurve::clamped(random_points(&mut rng, 6)).expect("valid curve");
    assert_eq!(curve.derivative(4, 0.4).expect("fourth derivative"), Vec3::ZERO);
    let third = curve.derivative(3, 0.1).expect("third derivative");
    assert!(third.length() > 0.0);
}

#[test]
fn knot_interval_defaults_to_last_span() {
    let curve = BSplineCurve::clamped(vec![Point3::ORIGIN; 7]).expect("valid curve");
    assert_eq!(curve.knot_interval(0.0), 3);
    assert_eq!(curve.knot_interval(1.0), 6);
    assert_eq!(curve.knot_interval(0.5), 5);
    assert_eq!(curve.knot_interval(0.3), 4);
}

#[test]
fn straight_curve_has_zero_curvature() {
    let curve = BSplineCurve::clamped(
        (0..5).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect(),
    )
    .expect("valid curve");
    let k = curve.curvature_at(0.37).expect("curvature");
    assert!(k.abs() < 1e-12);
    assert!(curve.tangent_at(0.37).is_some_and(|t| Tolerance::DEFAULT.approx_eq_vec3(t, Vec3::X)));
}
