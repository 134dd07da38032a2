use crate::geom::Point3;
use crate::rig::{PointTrack, PoseKey};

fn pose(time: f64, x: f64) -> PoseKey {
    PoseKey {
        time,
        points: vec![Point3::new(x, 0.0, 0.0), Point3::new(x, 1.0, 0.0)],
    }
}

#[test]
fn empty_track_has_no_pose() {
    assert!(PointTrack::new().sample(1.0).is_none());
}

#[test]
fn poses_interpolate_per_point_and_hold_outside_the_range() {
    let mut track = PointTrack::new();
    track.set_key(pose(10.0, 4.0));
    track.set_key(pose(0.0, 0.0));

    let mid = track.sample(2.5).expect("pose");
    assert_eq!(mid, vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)]);
    assert_eq!(track.sample(-3.0).expect("pose")[0], Point3::new(0.0, 0.0, 0.0));
    assert_eq!(track.sample(30.0).expect("pose")[0], Point3::new(4.0, 0.0, 0.0));
}

#[test]
fn keys_at_the_same_time_are_replaced() {
    let mut track = PointTrack::new();
    track.set_key(pose(1.0, 0.0));
    track.set_key(pose(1.0, 2.0));
    assert_eq!(track.keys().len(), 1);
    assert_eq!(track.keys()[0].points[0].x, 2.0);
}

#[test]
fn mismatched_point_counts_step() {
    let mut track = PointTrack::new();
    track.set_key(pose(0.0, 0.0));
    track.set_key(PoseKey {
        time: 1.0,
        points: vec![Point3::new(5.0, 0.0, 0.0)],
    });
    assert_eq!(track.sample(0.5).expect("pose").len(), 2);
}
