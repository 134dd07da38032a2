//! Joint chains: a root, one to three joints and an end point shaped into a piecewise T-Bezier.
//!
//! Each joint is replaced by two virtual control points spread laterally around it, so the curve
//! rounds the corner instead of passing through the joint.

use std::f64::consts::{FRAC_PI_2, PI};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::geom::{
    CubicTBezier, Curve3, PiecewiseTBezier, Point3, Vec3, arc_length_parameters,
    arc_length_to_natural, compute_lengths, natural_parameters, natural_to_arc_length,
};

use super::RigError;
use super::sampler::{SampledCurve, parameter_count};

/// Divisor that makes a joint offset of `1.0` roughly pull the curve through the joint.
const JOINT_OFFSET_DIVISOR: f64 = 19.0;

/// How chain samples are spread over the `[0, joints]` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainParameterization {
    Natural,
    ArcLength,
    /// Arc-length uniform within sections split at the samples closest to each joint.
    #[default]
    SplitLength,
}

impl ChainParameterization {
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Natural),
            1 => Some(Self::ArcLength),
            2 => Some(Self::SplitLength),
            _ => None,
        }
    }
}

/// Virtual control points generated for one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointGeometry {
    /// Joint position after the perpendicular offset.
    pub position: Point3,
    pub lateral: Vec3,
    pub perpendicular: Vec3,
    /// `position + lateral·radius`, on the incoming side.
    pub plus: Point3,
    /// `position - lateral·radius`, on the outgoing side.
    pub minus: Point3,
}

impl JointGeometry {
    #[must_use]
    pub fn midpoint(&self) -> Point3 {
        self.plus.midpoint(self.minus)
    }
}

fn rotate_about(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let (s, c) = angle.sin_cos();
    v * c + axis.cross(v) * s + axis * (axis.dot(v) * (1.0 - c))
}

fn safe_acos(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).acos()
}

/// Lateral and perpendicular directions of the joint at `joint`, between `prev` and `next`.
#[must_use]
pub fn joint_geometry(
    prev: Point3,
    joint: Point3,
    next: Point3,
    offset_multiplier: f64,
    radius: f64,
) -> JointGeometry {
    let to_prev = (prev - joint).normalized_or(Vec3::X);
    let to_next = (next - joint).normalized_or(-to_prev);
    let across = (next - prev).normalized_or(-to_prev);

    let dot_joint = to_prev.dot(to_next);
    let joint_angle = safe_acos(dot_joint);
    let offset_angle = FRAC_PI_2 - joint_angle / 2.0;

    let plane_normal = to_prev.cross(to_next).normalized().unwrap_or_else(|| {
        trace!("collinear joint, choosing an arbitrary bend plane");
        to_prev.any_perpendicular()
    });
    let rotated = rotate_about(to_prev, plane_normal, -offset_angle);
    let counter_rotated = rotate_about(to_prev, plane_normal, offset_angle);

    let (lateral, perpendicular) =
        if dot_joint - rotated.dot(to_next) < dot_joint - counter_rotated.dot(to_next) {
            (counter_rotated, plane_normal.cross(rotated))
        } else {
            (rotated, rotated.cross(plane_normal))
        };

    let theta = safe_acos(to_prev.dot(-across));
    let alpha = PI - joint_angle / 2.0 - theta;
    let sin_alpha = alpha.sin();
    let offset = if sin_alpha.abs() <= f64::EPSILON {
        0.0
    } else {
        (prev.distance_to(joint) / sin_alpha) * theta.sin() * offset_multiplier
            / JOINT_OFFSET_DIVISOR
    };
    let position = joint + perpendicular * offset;

    JointGeometry {
        position,
        lateral,
        perpendicular,
        plus: position + lateral * radius,
        minus: position + lateral * -radius,
    }
}

/// Build the chain curve through `points` (root, joints, end).
///
/// Joint directions and lengths are measured on the original points, not on offset joints.
#[must_use]
pub fn build_chain_curve(
    points: &[Point3],
    joint_offset: f64,
    joint_radius: f64,
    volumes: &[f64],
) -> (PiecewiseTBezier, Vec<JointGeometry>) {
    let joint_count = points.len().saturating_sub(2);
    let joints: Vec<JointGeometry> = (1..=joint_count)
        .map(|k| {
            joint_geometry(
                points[k - 1],
                points[k],
                points[k + 1],
                joint_offset,
                joint_radius,
            )
        })
        .collect();

    let segments = (0..joint_count)
        .map(|s| {
            let start = if s == 0 {
                points[0]
            } else {
                joints[s - 1].minus.midpoint(joints[s].plus)
            };
            let end = if s + 1 == joint_count {
                points[joint_count + 1]
            } else {
                joints[s].minus.midpoint(joints[s + 1].plus)
            };
            let shape = volumes.get(s).copied().unwrap_or(0.0);
            CubicTBezier::new([start, joints[s].plus, joints[s].minus, end], shape, shape)
        })
        .collect();

    (PiecewiseTBezier::new(segments), joints)
}

/// Chain sampling inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub output_count: usize,
    pub subdivisions: usize,
    pub normal_up: Vec3,
    pub orient: bool,
    pub parameterization: ChainParameterization,
}

/// Sample a chain curve with the selected parameterization.
pub fn sample_chain(
    curve: &PiecewiseTBezier,
    joints: &[JointGeometry],
    settings: &ChainSettings,
) -> Result<SampledCurve, RigError> {
    let (lower, upper) = curve.domain();
    let count = parameter_count(settings.output_count, settings.subdivisions);

    let natural = natural_parameters(count, lower, upper)?;
    let (lengths, natural_points) = compute_lengths(curve, count)?;
    let arc: Vec<f64> = arc_length_parameters(&lengths)?
        .into_iter()
        .map(|a| a * upper)
        .collect();

    let params = match settings.parameterization {
        ChainParameterization::Natural => natural.clone(),
        ChainParameterization::ArcLength => arc.clone(),
        ChainParameterization::SplitLength => {
            split_length_parameters(curve, joints, &natural_points, &lengths)
        }
    };

    let mut samples = SampledCurve::new(
        lower,
        upper,
        settings.output_count,
        settings.subdivisions,
        natural,
        lengths,
        arc,
        params,
    );
    samples.hull = chain_hull(curve);
    if settings.orient {
        samples.orient(curve, settings.normal_up);
    } else {
        samples.stride(curve);
    }
    Ok(samples)
}

fn chain_hull(curve: &PiecewiseTBezier) -> Vec<Point3> {
    let mut hull: Vec<Point3> = Vec::with_capacity(curve.segments().len() * 3 + 1);
    for segment in curve.segments() {
        let start = usize::from(!hull.is_empty());
        hull.extend_from_slice(&segment.control_points[start..]);
    }
    hull
}

/// Parameters uniform in arc length within each section between consecutive stable parameters.
///
/// A stable parameter is the sampled parameter closest to a joint's virtual midpoint, refined
/// between neighbouring samples by the sign change of `(target - point)·tangent`. Falls back to
/// natural parameters when there are too few samples to anchor every joint.
#[must_use]
pub fn split_length_parameters(
    curve: &PiecewiseTBezier,
    joints: &[JointGeometry],
    points: &[Point3],
    lengths: &[f64],
) -> Vec<f64> {
    let count = lengths.len();
    let joint_count = joints.len();
    let range = joint_count as f64;
    let step = range / count.saturating_sub(1).max(1) as f64;

    if joint_count == 0 || count < joint_count + 2 {
        debug!("{count} samples cannot split {joint_count} joint(s), using natural parameters");
        return (0..count).map(|i| i as f64 * step).collect();
    }

    let mut stable = Vec::with_capacity(joint_count + 2);
    stable.push(0.0);
    for (j, joint) in joints.iter().enumerate() {
        let seed = (count * (2 * j + 1)) / (2 * joint_count);
        let refined = stable_parameter(curve, joint.midpoint(), points, seed.clamp(1, count - 2), step);
        let floor = stable.last().copied().unwrap_or(0.0);
        stable.push(refined.max(floor));
    }
    stable.push(range);

    let last = count - 1;
    let anchors: Vec<usize> = (0..=joint_count + 1)
        .map(|k| ((k * last) as f64 / (joint_count + 1) as f64).round() as usize)
        .collect();

    let total = lengths[last];
    let mut params = vec![0.0; count];
    for k in 0..=joint_count {
        let (a0, a1) = (anchors[k], anchors[k + 1]);
        let l0 = natural_to_arc_length(stable[k] / range, lengths) * total;
        let l1 = natural_to_arc_length(stable[k + 1] / range, lengths) * total;
        params[a0] = stable[k];
        let span = (a1 - a0) as f64;
        for i in a0 + 1..a1 {
            let target = l0 + (l1 - l0) * (i - a0) as f64 / span;
            let fraction = if total > 0.0 { target / total } else { 0.0 };
            params[i] = arc_length_to_natural(fraction, lengths) * range;
        }
    }
    params[last] = range;
    params
}

fn stable_parameter(
    curve: &PiecewiseTBezier,
    target: Point3,
    points: &[Point3],
    seed: usize,
    step: f64,
) -> f64 {
    let last = points.len() - 1;
    let distance = |i: usize| target.distance_to(points[i]);

    let mut closest = seed;
    let mut closest_distance = distance(closest);
    let direction: isize = if closest < last && distance(closest + 1) < closest_distance {
        1
    } else if closest > 0 && distance(closest - 1) < closest_distance {
        -1
    } else {
        0
    };
    while direction != 0 {
        let Some(next) = closest.checked_add_signed(direction).filter(|&n| n <= last) else {
            break;
        };
        let next_distance = distance(next);
        if next_distance >= closest_distance {
            break;
        }
        closest = next;
        closest_distance = next_distance;
    }

    let product = |i: usize| {
        let towards = (target - points[i]).normalized_or(Vec3::ZERO);
        towards.dot(curve.derivative_at(i as f64 * step))
    };
    let at = product(closest);
    let before = if closest == 0 { at } else { product(closest - 1) };
    let after = if closest == last { at } else { product(closest + 1) };

    let base = closest as f64 * step;
    let changes_sign = |other: f64| (other < 0.0 && at > 0.0) || (other > 0.0 && at < 0.0);
    if changes_sign(before) {
        base - step * at.abs() / (before.abs() + at.abs())
    } else if changes_sign(after) {
        base + step * at.abs() / (after.abs() + at.abs())
    } else {
        base
    }
}
