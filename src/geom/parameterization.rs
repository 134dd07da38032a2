//! Natural and arc-length parameterizations over sampled curves.
//!
//! Arc length is approximated by accumulating chord lengths between uniformly spaced natural
//! samples; precision is controlled by the sample count, not by adaptive quadrature.

use super::core::Point3;
use super::curve::{CurveError, Curve3};

/// Uniform parameters from `lower` to `upper`; the last entry is exactly `upper`.
pub fn natural_parameters(count: usize, lower: f64, upper: f64) -> Result<Vec<f64>, CurveError> {
    if count < 2 {
        return Err(CurveError::TooFewSamples(count));
    }
    let step = (upper - lower) / (count - 1) as f64;
    let mut params: Vec<f64> = (0..count).map(|i| lower + step * i as f64).collect();
    params[count - 1] = upper;
    Ok(params)
}

/// Cumulative chord lengths at `count` uniform natural samples across the curve's domain.
///
/// Returns the sampled points alongside the lengths so callers can reuse them.
pub fn compute_lengths<C: Curve3 + ?Sized>(
    curve: &C,
    count: usize,
) -> Result<(Vec<f64>, Vec<Point3>), CurveError> {
    let (lower, upper) = curve.domain();
    let params = natural_parameters(count, lower, upper)?;

    let mut lengths = Vec::with_capacity(count);
    let mut points = Vec::with_capacity(count);
    let mut total = 0.0;
    let mut previous = curve.point_at(params[0]);
    lengths.push(0.0);
    points.push(previous);

    for &t in &params[1..] {
        let current = curve.point_at(t);
        total += current.distance_to(previous);
        lengths.push(total);
        points.push(current);
        previous = current;
    }

    Ok((lengths, points))
}

/// Index of the last sample whose length does not exceed `target`, capped so `index + 1` is valid.
fn lower_sample(lengths: &[f64], target: f64) -> usize {
    let first_not_below = lengths.partition_point(|&l| l < target);
    let index = match lengths.get(first_not_below) {
        Some(&l) if l > target => first_not_below.saturating_sub(1),
        _ => first_not_below,
    };
    index.min(lengths.len().saturating_sub(2))
}

/// Invert the arc-length table: normalized arc length in `[0, 1]` to a normalized natural parameter.
///
/// The result is relative to the sampled domain; closed curves remap it afterwards.
#[must_use]
pub fn arc_length_to_natural(fraction: f64, lengths: &[f64]) -> f64 {
    if fraction == 0.0 || fraction == 1.0 || lengths.len() < 2 {
        return fraction;
    }
    let total = lengths[lengths.len() - 1];
    if total <= 0.0 {
        return fraction;
    }

    let target = fraction * total;
    let index = lower_sample(lengths, target);
    let before = lengths[index];
    let after = lengths[index + 1];
    let skew = if after > before {
        (target - before) / (after - before)
    } else {
        0.0
    };
    (index as f64 + skew) / (lengths.len() - 1) as f64
}

/// Normalized natural parameter to the normalized arc length travelled up to it.
#[must_use]
pub fn natural_to_arc_length(t: f64, lengths: &[f64]) -> f64 {
    if t == 0.0 || t == 1.0 || lengths.len() < 2 {
        return t;
    }
    let total = lengths[lengths.len() - 1];
    if total <= 0.0 {
        return t;
    }

    let position = t.clamp(0.0, 1.0) * (lengths.len() - 1) as f64;
    let index = (position.floor() as usize).min(lengths.len() - 2);
    let skew = position - index as f64;
    let length = lengths[index] + (lengths[index + 1] - lengths[index]) * skew;
    length / total
}

/// Parameters that travel uniform arc-length increments; `0` first, `1` last.
pub fn arc_length_parameters(lengths: &[f64]) -> Result<Vec<f64>, CurveError> {
    let count = lengths.len();
    if count < 2 {
        return Err(CurveError::TooFewSamples(count));
    }
    let step = 1.0 / (count - 1) as f64;
    let mut params: Vec<f64> = (0..count)
        .map(|i| arc_length_to_natural(step * i as f64, lengths))
        .collect();
    params[0] = 0.0;
    params[count - 1] = 1.0;
    Ok(params)
}

/// Remap a normalized parameter into `[lower, upper]`.
#[must_use]
pub fn remap_to_domain(t: f64, lower: f64, upper: f64) -> f64 {
    lower + t * (upper - lower)
}

/// Weighted mix of natural and arc-length parameters with exact domain bounds at both ends.
#[must_use]
pub fn blend_parameters(natural: &[f64], arc: &[f64], blend: f64, lower: f64, upper: f64) -> Vec<f64> {
    let weight_natural = 1.0 - blend;
    let mut blended: Vec<f64> = natural
        .iter()
        .zip(arc)
        .map(|(&n, &a)| n * weight_natural + a * blend)
        .collect();
    if let Some(first) = blended.first_mut() {
        *first = lower;
    }
    if let Some(last) = blended.last_mut() {
        *last = upper;
    }
    blended
}
