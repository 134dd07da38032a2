use crate::geom::Vec3;
use crate::rig::falloff::{Adjustment, AdjustmentSet, FalloffCurve, FalloffMode};
use crate::rig::{Interpolation, RampPoint};

fn linear_down() -> Vec<RampPoint> {
    vec![
        RampPoint::new(0.0, 1.0, Interpolation::Linear),
        RampPoint::new(1.0, 0.0, Interpolation::Linear),
    ]
}

#[test]
fn forward_mode_maps_ramp_from_offset() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Forward, 0.2, 0.5, false);
    assert!((falloff.weight(0.2) - 1.0).abs() < 1e-12);
    assert!((falloff.weight(0.45) - 0.5).abs() < 1e-12);
    assert!(falloff.weight(0.7).abs() < 1e-12);
    assert!((falloff.weight(0.0) - 1.0).abs() < 1e-12);
}

#[test]
fn backward_mode_runs_towards_the_start() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Backward, 0.8, 0.4, false);
    assert!((falloff.weight(0.8) - 1.0).abs() < 1e-12);
    assert!((falloff.weight(0.6) - 0.5).abs() < 1e-12);
    assert!(falloff.weight(0.3).abs() < 1e-12);
}

#[test]
fn mirror_mode_is_symmetric_about_offset() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Mirror, 0.5, 1.0, false);
    for x in [0.05, 0.1, 0.2, 0.3, 0.45] {
        let below = falloff.weight(0.5 - x);
        let above = falloff.weight(0.5 + x);
        assert!((below - above).abs() < 1e-9, "{x}: {below} vs {above}");
    }
    assert!((falloff.weight(0.25) - 0.5).abs() < 1e-12);
}

#[test]
fn center_mode_centres_the_ramp_on_offset() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Center, 0.5, 0.5, false);
    assert!((falloff.weight(0.25) - 1.0).abs() < 1e-12);
    assert!((falloff.weight(0.5) - 0.5).abs() < 1e-12);
    assert!(falloff.weight(0.75).abs() < 1e-12);
}

#[test]
fn repeat_covers_the_whole_range() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Forward, 0.0, 0.25, true);
    for block in 0..4 {
        let start = 0.25 * f64::from(block);
        let mid = falloff.weight(start + 0.125);
        assert!((mid - 0.5).abs() < 1e-3, "block {block}: {mid}");
    }
    assert!(falloff.weight(0.99) < 0.05);
}

#[test]
fn repeat_blocks_step_at_their_seams() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Forward, 0.0, 0.25, true);
    let ramp = falloff.ramp();
    assert_eq!(ramp.len(), 8);
    let steps = ramp
        .points()
        .filter(|p| p.interpolation == Interpolation::None)
        .count();
    assert_eq!(steps, 4);
}

#[test]
fn tiny_distance_skips_repeat() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Forward, 0.5, 0.005, true);
    assert_eq!(falloff.ramp().len(), 2);
}

#[test]
fn weights_are_clamped_to_unit_range() {
    let points = vec![
        RampPoint::new(0.0, 1.5, Interpolation::Spline),
        RampPoint::new(1.0, -0.5, Interpolation::Spline),
    ];
    let falloff = FalloffCurve::build(&points, FalloffMode::Forward, 0.0, 1.0, false);
    for i in 0..=20 {
        let w = falloff.weight(f64::from(i) / 20.0);
        assert!((0.0..=1.0).contains(&w));
    }
}

#[test]
fn adjustment_set_sums_weighted_values() {
    let falloff = FalloffCurve::build(&linear_down(), FalloffMode::Forward, 0.0, 1.0, false);
    let set = AdjustmentSet {
        twist: Some(vec![
            Adjustment {
                falloff: falloff.clone(),
                value: 1.0,
            },
            Adjustment {
                falloff: falloff.clone(),
                value: 0.5,
            },
        ]),
        scale: Some(vec![Adjustment {
            falloff: falloff.clone(),
            value: Vec3::new(1.0, 0.0, -0.5),
        }]),
        position: None,
    };
    assert!((set.twist_at(0.0) - 1.5).abs() < 1e-12);
    assert!((set.twist_at(0.5) - 0.75).abs() < 1e-12);
    assert_eq!(set.scale_at(0.0), Some(Vec3::new(2.0, 1.0, 0.5)));
    assert_eq!(set.position_at(0.0), None);
}

#[test]
fn disabled_groups_contribute_nothing() {
    let set = AdjustmentSet::default();
    assert_eq!(set.twist_at(0.3), 0.0);
    assert_eq!(set.scale_at(0.3), None);
}
