use std::f64::consts::FRAC_PI_2;

use super::core::{Point3, Vec3};
use super::curve::Curve3;

/// Cubic trigonometric Bezier with two shape parameters in `[-1, 1]`.
///
/// Shape `0` gives the neutral form; positive values pull the curve towards the inner control
/// points, negative values push it away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicTBezier {
    pub control_points: [Point3; 4],
    pub shape1: f64,
    pub shape2: f64,
}

impl CubicTBezier {
    #[must_use]
    pub fn new(control_points: [Point3; 4], shape1: f64, shape2: f64) -> Self {
        Self {
            control_points,
            shape1: shape1.clamp(-1.0, 1.0),
            shape2: shape2.clamp(-1.0, 1.0),
        }
    }

    fn basis(&self, t: f64) -> [f64; 4] {
        let (s, c) = (FRAC_PI_2 * t).sin_cos();
        let (l1, l2) = (self.shape1, self.shape2);
        [
            (1.0 - s).powi(2) * (1.0 - l1 * s),
            s * (1.0 - s) * (2.0 + l1 - l1 * s),
            c * (1.0 - c) * (2.0 + l2 - l2 * c),
            (1.0 - c).powi(2) * (1.0 - l2 * c),
        ]
    }

    fn basis_derivative(&self, t: f64) -> [f64; 4] {
        let (s, c) = (FRAC_PI_2 * t).sin_cos();
        let (l1, l2) = (self.shape1, self.shape2);
        let (ls, lc) = (l1 * s, l2 * c);
        // d/dt sin = c·π/2, d/dt cos = -s·π/2
        [
            FRAC_PI_2 * ((1.0 - s) * -2.0 * c * (1.0 - ls) + (1.0 - s).powi(2) * (-l1 * c)),
            FRAC_PI_2
                * (c * (1.0 - s) * (2.0 + l1 - ls) - s * c * (2.0 + l1 - ls)
                    + s * (1.0 - s) * -l1 * c),
            FRAC_PI_2
                * (-s * (1.0 - c) * (2.0 + l2 - lc) + c * s * (2.0 + l2 - lc)
                    + c * (1.0 - c) * l2 * s),
            FRAC_PI_2 * ((1.0 - c) * 2.0 * s * (1.0 - lc) + (1.0 - c).powi(2) * (l2 * s)),
        ]
    }

    fn combine(&self, weights: [f64; 4]) -> Vec3 {
        self.control_points
            .iter()
            .zip(weights)
            .fold(Vec3::ZERO, |acc, (p, w)| acc + p.to_vec3() * w)
    }
}

impl Curve3 for CubicTBezier {
    fn point_at(&self, t: f64) -> Point3 {
        Point3::from(self.combine(self.basis(t.clamp(0.0, 1.0))))
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        self.combine(self.basis_derivative(t.clamp(0.0, 1.0)))
    }
}

/// Consecutive T-Bezier segments sharing a `[0, segments]` parameter domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PiecewiseTBezier {
    segments: Vec<CubicTBezier>,
}

impl PiecewiseTBezier {
    #[must_use]
    pub fn new(segments: Vec<CubicTBezier>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[CubicTBezier] {
        &self.segments
    }

    /// Segment index and local parameter for a global parameter.
    ///
    /// Shared boundaries belong to the earlier segment.
    #[must_use]
    pub fn locate(&self, t: f64) -> (usize, f64) {
        let last = self.segments.len().saturating_sub(1);
        let t = t.clamp(0.0, self.segments.len() as f64);
        let index = (t.ceil() as usize).saturating_sub(1).min(last);
        (index, t - index as f64)
    }
}

impl Curve3 for PiecewiseTBezier {
    fn point_at(&self, t: f64) -> Point3 {
        let (index, local) = self.locate(t);
        self.segments
            .get(index)
            .map_or(Point3::ORIGIN, |segment| segment.point_at(local))
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, self.segments.len() as f64)
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let (index, local) = self.locate(t);
        self.segments
            .get(index)
            .map_or(Vec3::ZERO, |segment| segment.derivative_at(local))
    }
}
