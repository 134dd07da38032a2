use std::f64::consts::{FRAC_PI_2, PI};

use crate::geom::{Point3, Vec3};
use crate::rig::counter_twist::{MAX_TIME_STEPS, signed_twist_angle, unwrapped_delta};
use crate::rig::{
    AnimCurve, AnimatedNode, CounterTwistSolver, CurveProvider, EndFrame, FlexiNode, Keyframe,
    KeyframeStore, NodeKind, RigError, SceneTime, SolverError, SpineConfig, TimeContext,
};

struct Recorder {
    commits: usize,
    keys: Vec<Keyframe>,
}

impl KeyframeStore for Recorder {
    fn commit(&mut self, keys: &[Keyframe]) -> Result<(), String> {
        self.commits += 1;
        self.keys.extend_from_slice(keys);
        Ok(())
    }
}

/// End frame spinning about +Z at a fixed rate, failing past `fail_after`.
struct Spinner {
    rate: f64,
    fail_after: f64,
    orient: bool,
}

impl CurveProvider for Spinner {
    fn is_orient_enabled(&self) -> bool {
        self.orient
    }

    fn counter_twist_up(&self) -> Vec3 {
        Vec3::Y
    }

    fn end_frame_at(&mut self, time: f64) -> Result<EndFrame, RigError> {
        if time > self.fail_after {
            return Err(RigError::NoOutput);
        }
        let (s, c) = (self.rate * time).sin_cos();
        Ok(EndFrame {
            tangent: Vec3::Z,
            normal: Vec3::new(-s, c, 0.0),
        })
    }
}

fn spinner(rate: f64) -> Spinner {
    Spinner {
        rate,
        fail_after: f64::INFINITY,
        orient: true,
    }
}

#[test]
fn signed_angle_follows_rotation_direction() {
    let quarter = signed_twist_angle(Vec3::Y, Vec3::Z, Vec3::new(-1.0, 0.0, 0.0));
    assert!((quarter + FRAC_PI_2).abs() < 1e-12);
    let other = signed_twist_angle(Vec3::Y, Vec3::Z, Vec3::X);
    assert!((other - FRAC_PI_2).abs() < 1e-12);
    assert_eq!(signed_twist_angle(Vec3::Y, Vec3::Z, Vec3::Y), -0.0);
}

#[test]
fn up_parallel_to_tangent_stays_finite() {
    let angle = signed_twist_angle(Vec3::Z, Vec3::Z, Vec3::Y);
    assert!(angle.is_finite());
}

#[test]
fn deltas_unwrap_across_the_half_turn() {
    assert!((unwrapped_delta(-3.0, 3.0) - (2.0 * PI - 6.0)).abs() < 1e-12);
    assert!((unwrapped_delta(3.0, -3.0) - (6.0 - 2.0 * PI)).abs() < 1e-12);
    assert_eq!(unwrapped_delta(0.5, 0.25), 0.25);
}

#[test]
fn invalid_inputs_are_rejected() {
    let mut time = SceneTime::new(0.0);
    let mut store = AnimCurve::new();

    let err = CounterTwistSolver::new(0.0, 10.0, 0.001)
        .solve(&mut spinner(0.1), &mut time, &mut store)
        .unwrap_err();
    assert!(matches!(err, SolverError::InvalidTimeStep(_)));

    let err = CounterTwistSolver::new(10.0, 0.0, 1.0)
        .solve(&mut spinner(0.1), &mut time, &mut store)
        .unwrap_err();
    assert!(matches!(err, SolverError::InvalidTimeRange { .. }));

    let mut disabled = Spinner {
        orient: false,
        ..spinner(0.1)
    };
    let err = CounterTwistSolver::new(0.0, 10.0, 1.0)
        .solve(&mut disabled, &mut time, &mut store)
        .unwrap_err();
    assert!(matches!(err, SolverError::OrientationDisabled));
    assert!(store.keys().is_empty());
}

#[test]
fn unbounded_time_ranges_are_rejected() {
    let mut time = SceneTime::new(0.0);
    let mut store = AnimCurve::new();

    for (start, end) in [(0.0, f64::INFINITY), (f64::NEG_INFINITY, 0.0), (f64::NAN, 1.0)] {
        let err = CounterTwistSolver::new(start, end, 1.0)
            .solve(&mut spinner(0.1), &mut time, &mut store)
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidTimeRange { .. }), "{start}..{end}: {err}");
    }

    let err = CounterTwistSolver::new(0.0, 1e12, 0.01)
        .solve(&mut spinner(0.1), &mut time, &mut store)
        .unwrap_err();
    assert!(matches!(err, SolverError::TooManySteps { .. }));
    assert!(CounterTwistSolver::new(0.0, 1e12, 0.01).times().is_empty());
    assert!(store.keys().is_empty());
    assert_eq!(time.time(), 0.0);
}

#[test]
fn longest_accepted_range_is_walked() {
    let solver = CounterTwistSolver::new(0.0, MAX_TIME_STEPS as f64, 1.0);
    assert!(solver.validate(&spinner(0.1)).is_ok());
    assert_eq!(solver.times().len(), MAX_TIME_STEPS + 1);
    let too_long = CounterTwistSolver::new(0.0, MAX_TIME_STEPS as f64 + 1.0, 1.0);
    assert!(matches!(
        too_long.validate(&spinner(0.1)),
        Err(SolverError::TooManySteps { .. })
    ));
}

#[test]
fn animated_up_vector_is_read_every_frame() {
    fn straight(up_angle: f64) -> NodeKind {
        let mut config = SpineConfig {
            control_points: (0..4).map(|i| Point3::new(0.0, 0.0, f64::from(i))).collect(),
            ..SpineConfig::default()
        };
        config.rig.output_count = 4;
        config.rig.subdivisions = 2;
        let (s, c) = up_angle.sin_cos();
        config.rig.counter_twist_up_override.enabled = true;
        config.rig.counter_twist_up_override.vector = Vec3::new(-s, c, 0.0);
        NodeKind::Spine(config)
    }

    // Fixed end normal, counter-twist up turning about the tangent.
    let mut provider = AnimatedNode::new(FlexiNode::new(straight(0.0)), |time, node| {
        node.set_kind(straight(0.1 * time));
    });
    let mut time = SceneTime::new(0.0);
    let mut store = AnimCurve::new();
    let keys = CounterTwistSolver::new(0.0, 10.0, 1.0)
        .solve(&mut provider, &mut time, &mut store)
        .expect("solve");

    assert_eq!(keys.len(), 11);
    for key in &keys {
        assert!((key.value + 0.1 * key.time).abs() < 1e-9, "{key:?}");
    }
}

#[test]
fn steady_spin_produces_linear_keys() {
    let mut time = SceneTime::new(7.0);
    let mut store = Recorder {
        commits: 0,
        keys: Vec::new(),
    };
    let keys = CounterTwistSolver::new(0.0, 10.0, 1.0)
        .solve(&mut spinner(0.2), &mut time, &mut store)
        .expect("solve");

    assert_eq!(keys.len(), 11);
    assert_eq!(store.commits, 1);
    assert_eq!(store.keys, keys);
    assert_eq!(time.time(), 7.0);
    for key in &keys {
        assert!((key.value - 0.2 * key.time).abs() < 1e-9, "{key:?}");
    }
}

#[test]
fn accumulation_survives_more_than_a_full_turn() {
    let mut time = SceneTime::new(0.0);
    let mut store = AnimCurve::new();
    let keys = CounterTwistSolver::new(0.0, 40.0, 1.0)
        .solve(&mut spinner(0.5), &mut time, &mut store)
        .expect("solve");
    let last = keys.last().expect("keys");
    assert!((last.value - 20.0).abs() < 1e-9);
    assert!((store.value_at(40.0) - 20.0).abs() < 1e-9);
}

#[test]
fn failed_evaluation_writes_nothing_and_restores_time() {
    let mut time = SceneTime::new(3.5);
    let mut store = AnimCurve::new();
    let mut provider = Spinner {
        fail_after: 4.0,
        ..spinner(0.1)
    };
    let err = CounterTwistSolver::new(0.0, 10.0, 1.0)
        .solve(&mut provider, &mut time, &mut store)
        .unwrap_err();
    assert!(matches!(err, SolverError::Evaluation { time, .. } if time == 5.0));
    assert!(store.keys().is_empty());
    assert_eq!(time.time(), 3.5);
}

#[test]
fn fractional_steps_reach_the_end_time() {
    let solver = CounterTwistSolver::new(1.0, 2.0, 0.1);
    let times = solver.times();
    assert_eq!(times.len(), 11);
    assert!((times[10] - 2.0).abs() < 1e-12);
}

#[test]
fn anim_curve_replaces_and_interpolates() {
    let mut curve = AnimCurve::new();
    curve
        .commit(&[
            Keyframe { time: 2.0, value: 4.0 },
            Keyframe { time: 0.0, value: 0.0 },
        ])
        .expect("commit");
    curve.set_key(Keyframe { time: 2.0, value: 2.0 });
    assert_eq!(curve.keys().len(), 2);
    assert_eq!(curve.value_at(1.0), 1.0);
    assert_eq!(curve.value_at(-1.0), 0.0);
    assert_eq!(curve.value_at(5.0), 2.0);
    assert!(curve.commit(&[Keyframe { time: 1.0, value: f64::NAN }]).is_err());
}

#[test]
fn animated_spine_counter_twist_cancels_drift() {
    fn spine(angle: f64) -> NodeKind {
        let mut config = SpineConfig {
            control_points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 2.0),
                Point3::new(0.0, 1.0, 4.0),
                Point3::new(2.0 * angle.sin(), 1.0, 4.0 + 2.0 * angle.cos()),
            ],
            ..SpineConfig::default()
        };
        config.rig.output_count = 6;
        config.rig.subdivisions = 10;
        NodeKind::Spine(config)
    }
    let angle_at = |time: f64| FRAC_PI_2 * time / 10.0;

    let mut provider = AnimatedNode::new(FlexiNode::new(spine(0.0)), move |time, node| {
        node.set_kind(spine(angle_at(time)));
    });
    let mut time = SceneTime::new(0.0);
    let mut store = AnimCurve::new();
    CounterTwistSolver::new(0.0, 10.0, 1.0)
        .solve(&mut provider, &mut time, &mut store)
        .expect("solve");

    for frame in 0..=10 {
        let t = f64::from(frame);
        let mut node = FlexiNode::new(spine(angle_at(t)));
        node.update(|kind| {
            let twist = &mut kind.rig_mut().twist;
            twist.counter_twist = store.value_at(t);
            twist.counter_twist_blend = 1.0;
        });
        node.evaluate().expect("evaluate");
        let last = *node.local_frames().expect("frames").last().expect("frame");
        let tangent = last.axis(0).normalized_or(Vec3::X);
        let normal = last.axis(1).normalized_or(Vec3::Y);
        let residual = signed_twist_angle(Vec3::Y, tangent, normal);
        assert!(residual.abs() < 1e-3, "frame {frame}: residual {residual}");
    }
}
