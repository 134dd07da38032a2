mod core;
mod curve;
mod euler;
mod parameterization;
mod quat;
mod rmf;
mod tbezier;

pub use core::{Point3, Tolerance, Transform, Vec3};
pub use curve::{
    BSplineCurve, Curve3, CurveError, DEGREE, ORDER, clamped_knot_vector, unclamped_knot_vector,
};
pub use euler::{RotateOrder, euler_from_transform};
pub use parameterization::{
    arc_length_parameters, arc_length_to_natural, blend_parameters, compute_lengths,
    natural_parameters, natural_to_arc_length, remap_to_domain,
};
pub use quat::Quat;
pub use rmf::{
    accumulate_reflections, double_reflection, principal_normal, stable_tangent,
    transported_normal,
};
pub use tbezier::{CubicTBezier, PiecewiseTBezier};

#[cfg(test)]
mod tests;
