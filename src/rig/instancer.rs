//! Instancer sampling: parameters slide along the curve by an offset and wrap around its domain.
//!
//! With a non-zero offset the sample parameters are no longer sorted, so rotation minimization
//! starts at the lower bound of the curve and is propagated from the smallest parameter onwards,
//! keeping the frames independent of the offset.

use log::trace;

use crate::geom::{
    Curve3, Point3, Quat, Vec3, arc_length_to_natural, compute_lengths, double_reflection,
    principal_normal, remap_to_domain, stable_tangent, transported_normal,
};

use super::RigError;
use super::sampler::{BoundaryFrame, CurveSampler, SampledCurve, parameter_count};

/// Instancer sampling inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstancerSettings {
    pub closed: bool,
    pub instance_count: usize,
    pub subdivisions: usize,
    pub blend: f64,
    /// Fraction of the curve the instances are shifted by; wrapped into `[0, 1)`.
    pub offset: f64,
    pub normal_up: Vec3,
    pub orient: bool,
}

/// Uniform natural parameters starting at `lower + span·offset`, wrapping past `upper`.
#[must_use]
pub fn offset_natural_parameters(count: usize, lower: f64, upper: f64, offset: f64) -> Vec<f64> {
    let span = upper - lower;
    let step = span / count.saturating_sub(1).max(1) as f64;
    let mut t = lower + span * offset;
    let mut params = Vec::with_capacity(count);
    for _ in 0..count {
        params.push(t);
        t += step;
        if t > upper {
            t -= span;
        }
    }
    close_wrapped(&mut params, offset, upper);
    params
}

/// Uniform arc-length parameters starting at `offset`, wrapping past the end of the curve.
#[must_use]
pub fn offset_arc_length_parameters(
    lengths: &[f64],
    offset: f64,
    closed: bool,
    lower: f64,
    upper: f64,
) -> Vec<f64> {
    let count = lengths.len();
    let step = 1.0 / count.saturating_sub(1).max(1) as f64;
    let mut percent = offset;
    let mut params = Vec::with_capacity(count);
    for _ in 0..count {
        let t = arc_length_to_natural(percent, lengths);
        params.push(if closed {
            remap_to_domain(t, lower, upper)
        } else {
            t
        });
        percent += step;
        if percent > 1.0 {
            percent -= 1.0;
        }
    }
    close_wrapped(&mut params, offset, upper);
    params
}

fn close_wrapped(params: &mut [f64], offset: f64, upper: f64) {
    let Some(&first) = params.first() else {
        return;
    };
    if let Some(last) = params.last_mut() {
        *last = if offset == 0.0 { upper } else { first };
    }
}

/// Sample the instancer's curve through the spine's cached B-spline.
pub fn sample_instancer(
    sampler: &mut CurveSampler,
    control_points: &[Point3],
    settings: &InstancerSettings,
) -> Result<SampledCurve, RigError> {
    let curve = sampler.prepare(control_points, settings.closed)?;
    let (lower, upper) = curve.domain();
    let count = parameter_count(settings.instance_count, settings.subdivisions);
    let offset = settings.offset - settings.offset.floor();

    let natural = offset_natural_parameters(count, lower, upper, offset);
    let (lengths, _) = compute_lengths(curve, count)?;
    let arc = offset_arc_length_parameters(&lengths, offset, settings.closed, lower, upper);
    let params: Vec<f64> = natural
        .iter()
        .zip(&arc)
        .map(|(&n, &a)| (n * (1.0 - settings.blend) + a * settings.blend).clamp(lower, upper))
        .collect();
    let min_index = params
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i);

    let mut samples = SampledCurve::new(
        lower,
        upper,
        settings.instance_count,
        settings.subdivisions,
        natural,
        lengths,
        arc,
        params,
    );
    samples.hull = curve.control_points().to_vec();
    samples.min_index = min_index;

    if settings.orient {
        orient_from_lower_bound(&mut samples, curve, settings.normal_up);
    } else {
        samples.stride(curve);
        let stride = settings.subdivisions + 1;
        samples.min_index = if count - min_index <= stride {
            0
        } else {
            min_index.div_ceil(stride)
        };
    }
    Ok(samples)
}

fn orient_from_lower_bound<C: Curve3 + ?Sized>(samples: &mut SampledCurve, curve: &C, up: Vec3) {
    let count = samples.params.len();
    let min = samples.min_index;
    let (lower, upper) = (samples.lower, samples.upper);

    let lower_point = curve.point_at(lower);
    let lower_tangent = stable_tangent(curve.derivative_at(lower), Vec3::X);
    let principal = principal_normal(up, lower_tangent);

    let mut points = vec![Point3::ORIGIN; count];
    let mut tangents = vec![lower_tangent; count];
    let mut reflections = vec![Quat::IDENTITY; count];

    let sample = |i: usize, previous: Vec3| {
        let t = samples.params[i];
        (curve.point_at(t), stable_tangent(curve.derivative_at(t), previous))
    };

    (points[min], tangents[min]) = sample(min, lower_tangent);
    reflections[min] = double_reflection(lower_point, points[min], lower_tangent, tangents[min]);

    let propagate = |range: std::ops::Range<usize>,
                     points: &mut [Point3],
                     tangents: &mut [Vec3],
                     reflections: &mut [Quat]| {
        for i in range {
            (points[i], tangents[i]) = sample(i, tangents[i - 1]);
            let step = double_reflection(points[i - 1], points[i], tangents[i - 1], tangents[i]);
            reflections[i] = step * reflections[i - 1];
        }
    };

    propagate(min + 1..count, &mut points, &mut tangents, &mut reflections);
    if min != 0 {
        trace!("instancer offset wraps at sample {min}");
        points[0] = points[count - 1];
        tangents[0] = tangents[count - 1];
        reflections[0] = reflections[count - 1];
    }
    propagate(1..min, &mut points, &mut tangents, &mut reflections);

    let normals: Vec<Vec3> = reflections
        .iter()
        .map(|&q| transported_normal(q, principal))
        .collect();
    let binormals: Vec<Vec3> = tangents
        .iter()
        .zip(&normals)
        .map(|(t, n)| t.cross(*n))
        .collect();

    let upper_point = curve.point_at(upper);
    let upper_tangent = stable_tangent(curve.derivative_at(upper), tangents[count - 1]);
    let max = if min == 0 { count - 1 } else { min - 1 };
    let to_upper = double_reflection(points[max], upper_point, tangents[max], upper_tangent);
    let upper_normal = transported_normal(to_upper * reflections[max], principal);

    samples.lower_bound = Some(BoundaryFrame {
        point: lower_point,
        tangent: lower_tangent,
        normal: principal,
        binormal: lower_tangent.cross(principal),
    });
    samples.upper_bound = Some(BoundaryFrame {
        point: upper_point,
        tangent: upper_tangent,
        normal: upper_normal,
        binormal: upper_tangent.cross(upper_normal),
    });
    samples.end_normal = Some(upper_normal);
    samples.points = points;
    samples.tangents = tangents;
    samples.normals = normals;
    samples.binormals = binormals;
    samples.reflections = reflections;
    samples.principal = Some(principal);
}
