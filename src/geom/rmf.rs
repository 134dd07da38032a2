//! Rotation-minimizing frames by the double reflection method (Wang, Jüttler, Zheng, Liu 2008).

use log::trace;

use super::core::{Point3, Tolerance, Vec3};
use super::quat::Quat;

/// Incremental rotation carrying a frame at `p0` with unit tangent `t0` to `p1` with unit tangent `t1`.
///
/// The first reflection uses the plane bisecting `p0 p1`, the second the plane bisecting the
/// reflected tangent and `t1`. Coincident samples or an already aligned reflected tangent fall back
/// to the shortest-arc rotation between the tangents.
#[must_use]
pub fn double_reflection(p0: Point3, p1: Point3, t0: Vec3, t1: Vec3) -> Quat {
    let Some(r1) = (p1 - p0).normalized() else {
        trace!("coincident rmf samples, using tangent arc");
        return Quat::from_rotation_arc(t0, t1);
    };

    let t0_reflected = (Quat::pure(r1) * Quat::pure(t0) * Quat::pure(r1)).vector();
    let Some(r2) = (t1 - t0_reflected).normalized() else {
        trace!("reflected tangent already aligned, using tangent arc");
        return Quat::from_rotation_arc(t0, t1);
    };

    Quat::pure_product(r2, r1)
        .normalized()
        .unwrap_or(Quat::IDENTITY)
}

/// Principal normal seeding the transport: `right = up × tangent`, `normal = tangent × right`.
///
/// An up vector parallel to the tangent is replaced by an arbitrary perpendicular axis.
#[must_use]
pub fn principal_normal(up: Vec3, tangent: Vec3) -> Vec3 {
    let right = match up.cross(tangent).normalized() {
        Some(right) => right,
        None => {
            trace!("up vector parallel to tangent, choosing a perpendicular seed");
            tangent.any_perpendicular()
        }
    };
    tangent.cross(right).normalized_or(tangent.any_perpendicular())
}

/// Normal carried by an accumulated reflection composition: `q n q*`, normalized.
#[must_use]
pub fn transported_normal(composition: Quat, principal: Vec3) -> Vec3 {
    composition.rotate(principal).normalized_or(principal)
}

/// Accumulated reflection compositions for consecutive samples, starting at identity.
#[must_use]
pub fn accumulate_reflections(points: &[Point3], tangents: &[Vec3]) -> Vec<Quat> {
    let mut reflections = Vec::with_capacity(points.len());
    if points.is_empty() {
        return reflections;
    }
    reflections.push(Quat::IDENTITY);
    for i in 1..points.len() {
        let step = double_reflection(points[i - 1], points[i], tangents[i - 1], tangents[i]);
        reflections.push(step * reflections[i - 1]);
    }
    reflections
}

/// Normalized tangent, reusing `previous` when the derivative vanishes.
#[must_use]
pub fn stable_tangent(derivative: Vec3, previous: Vec3) -> Vec3 {
    if Tolerance::ZERO_LENGTH.is_zero_vec3(derivative) {
        trace!("zero derivative, keeping previous tangent");
        return previous;
    }
    derivative.normalized_or(previous)
}
