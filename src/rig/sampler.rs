//! Curve sampling: control point preparation, cached knot vectors, parameterization and
//! rotation-minimizing frame transport.

use log::debug;

use crate::geom::{
    BSplineCurve, Curve3, DEGREE, ORDER, Point3, Quat, Vec3, accumulate_reflections,
    arc_length_parameters, blend_parameters, clamped_knot_vector, compute_lengths,
    natural_parameters, principal_normal, remap_to_domain, stable_tangent, transported_normal,
    unclamped_knot_vector,
};

use super::RigError;

/// Samples evaluated for `output_count` outputs with `subdivisions` extra samples in between.
#[must_use]
pub fn parameter_count(output_count: usize, subdivisions: usize) -> usize {
    output_count + output_count.saturating_sub(1) * subdivisions
}

/// Pad to at least [`ORDER`] points and, for closed curves, wrap the first [`DEGREE`] points.
///
/// The last user point moves to the front before wrapping so the seam sits at the first
/// user-specified point.
#[must_use]
pub fn wrap_control_points(points: &[Point3], closed: bool) -> Vec<Point3> {
    let count = if closed {
        points.len() + DEGREE
    } else {
        points.len()
    }
    .max(ORDER);

    let mut wrapped = vec![Point3::ORIGIN; count];
    wrapped[..points.len().min(count)].copy_from_slice(&points[..points.len().min(count)]);

    if closed {
        let last_user = wrapped[count - DEGREE - 1];
        wrapped.copy_within(0..count - DEGREE - 1, 1);
        wrapped[0] = last_user;
        wrapped.copy_within(0..DEGREE, count - DEGREE);
    }
    wrapped
}

/// Frame at one end of the parameter domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryFrame {
    pub point: Point3,
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl BoundaryFrame {
    fn unoriented(point: Point3, tangent: Vec3) -> Self {
        Self {
            point,
            tangent,
            normal: Vec3::ZERO,
            binormal: Vec3::ZERO,
        }
    }
}

/// Cached sampling result shared by every node variant.
///
/// With orientation enabled every parameter is sampled and the frame arrays have one entry per
/// parameter; without it only the `output_count` stride samples carry points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampledCurve {
    pub lower: f64,
    pub upper: f64,
    pub output_count: usize,
    pub subdivisions: usize,
    pub natural: Vec<f64>,
    pub lengths: Vec<f64>,
    pub arc_length: Vec<f64>,
    pub params: Vec<f64>,
    pub points: Vec<Point3>,
    pub tangents: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub binormals: Vec<Vec3>,
    pub reflections: Vec<Quat>,
    /// Seed normal of the transport, `None` without orientation.
    pub principal: Option<Vec3>,
    pub lower_bound: Option<BoundaryFrame>,
    pub upper_bound: Option<BoundaryFrame>,
    /// Untwisted normal at the upper bound, read by the counter-twist solver.
    pub end_normal: Option<Vec3>,
    /// Control points after padding and wrapping.
    pub hull: Vec<Point3>,
    /// Index of the smallest parameter; non-zero only for offset instancers.
    pub min_index: usize,
}

impl SampledCurve {
    #[must_use]
    pub fn is_oriented(&self) -> bool {
        self.principal.is_some()
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.points.len()
    }

    /// Parameter index backing stride sample `sample`.
    #[must_use]
    pub fn parameter_index(&self, sample: usize) -> usize {
        if self.is_oriented() {
            sample
        } else {
            sample * (self.subdivisions + 1)
        }
    }

    /// Natural parameter of `parameter_index` normalized into `[0, 1]` over the domain.
    #[must_use]
    pub fn weight(&self, parameter_index: usize) -> f64 {
        let span = self.upper - self.lower;
        if span <= 0.0 {
            return 0.0;
        }
        (self.natural[parameter_index] - self.lower) / span
    }

    pub(crate) fn new(
        lower: f64,
        upper: f64,
        output_count: usize,
        subdivisions: usize,
        natural: Vec<f64>,
        lengths: Vec<f64>,
        arc_length: Vec<f64>,
        params: Vec<f64>,
    ) -> Self {
        Self {
            lower,
            upper,
            output_count,
            subdivisions,
            natural,
            lengths,
            arc_length,
            params,
            ..Self::default()
        }
    }

    /// Sample every parameter and transport the up-seeded principal normal along the samples.
    pub(crate) fn orient<C: Curve3 + ?Sized>(&mut self, curve: &C, up: Vec3) {
        let mut points = Vec::with_capacity(self.params.len());
        let mut tangents: Vec<Vec3> = Vec::with_capacity(self.params.len());
        let mut previous = Vec3::X;
        for &t in &self.params {
            let tangent = stable_tangent(curve.derivative_at(t), previous);
            points.push(curve.point_at(t));
            tangents.push(tangent);
            previous = tangent;
        }

        let Some(&first_tangent) = tangents.first() else {
            return;
        };
        let principal = principal_normal(up, first_tangent);
        let reflections = accumulate_reflections(&points, &tangents);

        self.normals = reflections
            .iter()
            .map(|&q| transported_normal(q, principal))
            .collect();
        self.normals[0] = principal;
        self.binormals = tangents
            .iter()
            .zip(&self.normals)
            .map(|(t, n)| t.cross(*n))
            .collect();

        let last = points.len() - 1;
        self.lower_bound = Some(self.frame_at(&points, &tangents, 0));
        self.upper_bound = Some(self.frame_at(&points, &tangents, last));
        self.end_normal = Some(self.normals[last]);
        self.points = points;
        self.tangents = tangents;
        self.reflections = reflections;
        self.principal = Some(principal);
    }

    /// Sample only the output positions.
    pub(crate) fn stride<C: Curve3 + ?Sized>(&mut self, curve: &C) {
        self.points = (0..self.output_count)
            .map(|i| curve.point_at(self.params[i * (self.subdivisions + 1)]))
            .collect();
        self.lower_bound = Some(BoundaryFrame::unoriented(
            curve.point_at(self.lower),
            curve.tangent_at(self.lower).unwrap_or(Vec3::X),
        ));
        self.upper_bound = Some(BoundaryFrame::unoriented(
            curve.point_at(self.upper),
            curve.tangent_at(self.upper).unwrap_or(Vec3::X),
        ));
    }

    fn frame_at(&self, points: &[Point3], tangents: &[Vec3], index: usize) -> BoundaryFrame {
        BoundaryFrame {
            point: points[index],
            tangent: tangents[index],
            normal: self.normals[index],
            binormal: self.binormals[index],
        }
    }
}

/// Spine sampling inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSettings {
    pub closed: bool,
    pub output_count: usize,
    pub subdivisions: usize,
    pub blend: f64,
    pub normal_up: Vec3,
    pub orient: bool,
}

/// Owns the spine's B-spline and rebuilds its knot vector only when the control point count or
/// closedness changes.
#[derive(Debug, Clone, Default)]
pub struct CurveSampler {
    curve: Option<BSplineCurve>,
    closed: bool,
    knot_builds: usize,
}

impl CurveSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn curve(&self) -> Option<&BSplineCurve> {
        self.curve.as_ref()
    }

    /// Number of times the knot vector was rebuilt.
    #[must_use]
    pub const fn knot_builds(&self) -> usize {
        self.knot_builds
    }

    /// Wrap `control_points` and update the cached curve.
    pub fn prepare(
        &mut self,
        control_points: &[Point3],
        closed: bool,
    ) -> Result<&BSplineCurve, RigError> {
        let wrapped = wrap_control_points(control_points, closed);
        let curve = match self.curve.take() {
            Some(mut curve)
                if self.closed == closed && curve.control_points().len() == wrapped.len() =>
            {
                curve.set_control_points(wrapped)?;
                curve
            }
            _ => {
                let n = wrapped.len() - 1;
                debug!(
                    "rebuilding {} knot vector for {} control points",
                    if closed { "unclamped" } else { "clamped" },
                    wrapped.len()
                );
                let knots = if closed {
                    unclamped_knot_vector(n, DEGREE)
                } else {
                    clamped_knot_vector(n, DEGREE)
                };
                self.knot_builds += 1;
                BSplineCurve::new(DEGREE, wrapped, knots)?
            }
        };
        self.closed = closed;
        Ok(self.curve.insert(curve))
    }

    pub fn sample(
        &mut self,
        control_points: &[Point3],
        settings: &SampleSettings,
    ) -> Result<SampledCurve, RigError> {
        let curve = self.prepare(control_points, settings.closed)?;
        let (lower, upper) = curve.domain();
        let count = parameter_count(settings.output_count, settings.subdivisions);

        let natural = natural_parameters(count, lower, upper)?;
        let (lengths, _) = compute_lengths(curve, count)?;
        let mut arc = arc_length_parameters(&lengths)?;
        if settings.closed {
            for a in &mut arc {
                *a = remap_to_domain(*a, lower, upper);
            }
        }
        let params = blend_parameters(&natural, &arc, settings.blend, lower, upper);

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
        samples.hull = curve.control_points().to_vec();
        if settings.orient {
            samples.orient(curve, settings.normal_up);
        } else {
            samples.stride(curve);
        }
        Ok(samples)
    }
}
