use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::geom::{Point3, RotateOrder, Tolerance, Transform, Vec3};
use crate::rig::{
    ChainConfig, EvalState, FlexiNode, InstancerConfig, NodeKind, RigError, SpineConfig,
    TwistInputs, evaluate_all,
};

fn line_spine(orient: bool) -> NodeKind {
    let mut config = SpineConfig {
        control_points: (0..4).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect(),
        ..SpineConfig::default()
    };
    config.rig.output_count = 5;
    config.rig.subdivisions = 4;
    config.rig.compute_orientation = orient;
    NodeKind::Spine(config)
}

fn elbow_chain() -> NodeKind {
    NodeKind::ChainSingle(ChainConfig {
        points: vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        ],
        joint_radius: 2.0,
        ..ChainConfig::default()
    })
}

#[test]
fn outputs_require_evaluation() {
    let mut node = FlexiNode::new(line_spine(true));
    assert_eq!(node.local_frames().unwrap_err(), RigError::NoOutput);
    node.evaluate().expect("evaluate");
    assert_eq!(node.state(), EvalState::Evaluated);
    assert_eq!(node.local_frames().expect("frames").len(), 5);

    node.set_twist(TwistInputs {
        end_twist: 1.0,
        ..TwistInputs::default()
    });
    assert_eq!(node.state(), EvalState::Stale);
    assert!(node.local_positions().is_err());
}

#[test]
fn straight_line_without_orientation() {
    let mut node = FlexiNode::new(line_spine(false));
    node.evaluate().expect("evaluate");
    let positions = node.local_positions().expect("positions");
    assert_eq!(positions.len(), 5);
    for (i, p) in positions.iter().enumerate() {
        assert!(Tolerance::LOOSE.approx_eq_point3(*p, Point3::new(0.75 * i as f64, 0.0, 0.0)));
    }
    for rotation in node.local_rotations().expect("rotations") {
        assert!(Tolerance::LOOSE.approx_eq_vec3(rotation, Vec3::ZERO));
    }
    for scale in node.local_scales().expect("scales") {
        assert!(Tolerance::LOOSE.approx_eq_vec3(scale, Vec3::ONE));
    }
}

#[test]
fn discard_last_output_drops_one_frame() {
    let mut kind = line_spine(true);
    kind.rig_mut().discard_last_output = true;
    let mut node = FlexiNode::new(kind);
    node.evaluate().expect("evaluate");
    assert_eq!(node.local_frames().expect("frames").len(), 4);
}

#[test]
fn world_outputs_apply_the_node_transform() {
    let mut node = FlexiNode::new(line_spine(true));
    node.evaluate().expect("evaluate");
    let world = Transform::translate(Vec3::new(0.0, 5.0, 0.0))
        .compose(Transform::rotate_z(FRAC_PI_2))
        .compose(Transform::scale(2.0, 2.0, 2.0));

    let positions = node.world_positions(&world).expect("positions");
    assert!(Tolerance::LOOSE.approx_eq_point3(positions[4], Point3::new(0.0, 11.0, 0.0)));

    let rotations = node.world_rotations(&world).expect("rotations");
    assert!(Tolerance::LOOSE.approx_eq_vec3(rotations[0], Vec3::new(0.0, 0.0, FRAC_PI_2)));

    for scale in node.world_scales(&world).expect("scales") {
        assert!(Tolerance::LOOSE.approx_eq_vec3(scale, Vec3::new(2.0, 2.0, 2.0)));
    }
}

#[test]
fn rotate_order_is_honoured() {
    let mut kind = line_spine(true);
    kind.rig_mut().twist.roll = 0.4;
    kind.rig_mut().rotate_order = RotateOrder::Zyx;
    let mut node = FlexiNode::new(kind);
    node.evaluate().expect("evaluate");
    let rotation = node.local_rotations().expect("rotations")[0];
    assert!(Tolerance::LOOSE.approx_eq_vec3(rotation, Vec3::new(0.4, 0.0, 0.0)));
}

fn line_with_normal_up(vector: Vec3) -> FlexiNode {
    let mut kind = line_spine(true);
    kind.rig_mut().normal_up_override.enabled = true;
    kind.rig_mut().normal_up_override.vector = vector;
    let mut node = FlexiNode::new(kind);
    node.evaluate().expect("evaluate");
    node
}

#[test]
fn stability_is_the_dot_of_up_and_tangent() {
    let mut node = FlexiNode::new(line_spine(true));
    node.evaluate().expect("evaluate");
    assert!(node.normal_stability().expect("stability").abs() < 1e-9);
    assert!(node.counter_twist_stability().expect("stability").abs() < 1e-9);

    let parallel = line_with_normal_up(Vec3::X);
    assert!((parallel.normal_stability().expect("stability") - 1.0).abs() < 1e-9);

    let opposed = line_with_normal_up(Vec3::new(-3.0, 0.0, 0.0));
    assert!((opposed.normal_stability().expect("stability") + 1.0).abs() < 1e-9);
    // The counter-twist up is independent of the normal-up override.
    assert!(opposed.counter_twist_stability().expect("stability").abs() < 1e-9);

    let diagonal = line_with_normal_up(Vec3::new(1.0, 1.0, 0.0));
    let expected = FRAC_PI_4.cos();
    assert!((diagonal.normal_stability().expect("stability") - expected).abs() < 1e-9);
}

#[test]
fn stability_requires_orientation() {
    let mut node = FlexiNode::new(line_spine(false));
    node.evaluate().expect("evaluate");
    assert_eq!(node.normal_stability().unwrap_err(), RigError::OrientationDisabled);
    assert_eq!(node.end_frame().unwrap_err(), RigError::OrientationDisabled);
}

#[test]
fn draw_data_marks_the_node_drawn() {
    let mut node = FlexiNode::new(line_spine(true));
    assert!(node.draw_data().is_err());
    node.evaluate().expect("evaluate");
    let data = node.draw_data().expect("draw");
    assert_eq!(node.state(), EvalState::Drawn);
    assert_eq!(data.curve.len(), 21);
    assert_eq!(data.hull.len(), 4);
    assert_eq!(data.normals.len(), 21);
    assert_eq!(data.ribbon.len(), 21);
    let [a, b] = data.ribbon[0];
    assert!((a.distance_to(b) - 1.0).abs() < 1e-9);
}

#[test]
fn empty_spine_is_rejected() {
    let mut node = FlexiNode::new(NodeKind::Spine(SpineConfig::default()));
    assert!(matches!(node.evaluate(), Err(RigError::InvalidConfig(_))));
    assert_eq!(node.state(), EvalState::Stale);
}

#[test]
fn chain_node_ends_on_the_chain_points() {
    let mut node = FlexiNode::new(elbow_chain());
    node.evaluate().expect("evaluate");
    assert_eq!(node.joints().len(), 1);
    let positions = node.local_positions().expect("positions");
    assert_eq!(positions.len(), 10);
    assert!(Tolerance::LOOSE.approx_eq_point3(positions[0], Point3::ORIGIN));
    assert!(Tolerance::LOOSE.approx_eq_point3(positions[9], Point3::new(10.0, 10.0, 0.0)));
}

#[test]
fn chain_points_are_fitted_to_the_joint_count() {
    let node = FlexiNode::new(NodeKind::ChainTriple(ChainConfig {
        points: vec![Point3::ORIGIN; 3],
        joint_volumes: vec![5.0],
        ..ChainConfig::default()
    }));
    let NodeKind::ChainTriple(config) = node.kind() else {
        panic!("kind changed");
    };
    assert_eq!(config.points.len(), 5);
    assert_eq!(config.joint_volumes, vec![1.0, 0.0, 0.0]);
}

#[test]
fn instancer_position_adjustment_offsets_instances() {
    let mut config = InstancerConfig {
        control_points: (0..4).map(|i| Point3::new(f64::from(i), 0.0, 0.0)).collect(),
        ..InstancerConfig::default()
    };
    config.rig.output_count = 3;
    config.position_adjustments.enabled = true;
    config.position_adjustments.adjustments.push(crate::rig::AdjustmentDescriptor {
        value: Vec3::new(0.0, 1.0, 0.0),
        ..crate::rig::AdjustmentDescriptor::default()
    });
    let mut node = FlexiNode::new(NodeKind::Instancer(config));
    node.evaluate().expect("evaluate");
    let positions = node.local_positions().expect("positions");
    assert!(Tolerance::LOOSE.approx_eq_point3(positions[0], Point3::new(0.0, 1.0, 0.0)));
    assert!(Tolerance::LOOSE.approx_eq_point3(positions[1], Point3::new(1.5, 0.5, 0.0)));
    assert!(Tolerance::LOOSE.approx_eq_point3(positions[2], Point3::new(3.0, 0.0, 0.0)));
}

#[test]
fn evaluate_all_reports_each_node() {
    let mut nodes = vec![
        FlexiNode::new(line_spine(true)),
        FlexiNode::new(NodeKind::Spine(SpineConfig::default())),
        FlexiNode::new(elbow_chain()),
    ];
    let results = evaluate_all(&mut nodes);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    assert_eq!(nodes[2].state(), EvalState::Evaluated);
}

#[test]
fn unchanged_inputs_skip_reevaluation() {
    let mut node = FlexiNode::new(line_spine(true));
    node.evaluate().expect("evaluate");
    node.evaluate().expect("evaluate");
    node.set_points((0..4).map(|i| Point3::new(f64::from(i), 1.0, 0.0)).collect());
    node.evaluate().expect("evaluate");
    assert_eq!(node.knot_builds(), 1);
    assert!(Tolerance::LOOSE.approx_eq_point3(
        node.local_positions().expect("positions")[0],
        Point3::new(0.0, 1.0, 0.0)
    ));
}
