//! Turns sampled frames into output transforms by applying twist, scale and position adjustments.

use crate::geom::{Point3, Transform, Vec3};

use super::config::TwistInputs;
use super::falloff::AdjustmentSet;
use super::sampler::{BoundaryFrame, SampledCurve};

/// Combines the twist inputs and adjustments of one node evaluation.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder<'a> {
    twist: &'a TwistInputs,
    adjustments: &'a AdjustmentSet,
    ribbon: bool,
}

impl<'a> FrameBuilder<'a> {
    #[must_use]
    pub const fn new(twist: &'a TwistInputs, adjustments: &'a AdjustmentSet, ribbon: bool) -> Self {
        Self {
            twist,
            adjustments,
            ribbon,
        }
    }

    /// Twist in radians at normalized parameter `w`.
    #[must_use]
    pub fn total_twist(&self, w: f64) -> f64 {
        self.twist.twist_at(w) + self.adjustments.twist_at(w)
    }

    #[must_use]
    pub fn total_scale(&self, w: f64) -> Vec3 {
        self.adjustments.scale_at(w).unwrap_or(Vec3::ONE)
    }

    /// Oriented frame: twist about the tangent, then position adjustment in the twisted frame,
    /// then scale of the local axes.
    #[must_use]
    pub fn compose(
        &self,
        point: Point3,
        tangent: Vec3,
        normal: Vec3,
        binormal: Vec3,
        w: f64,
    ) -> Transform {
        let mut frame =
            Transform::from_axes(point, tangent, normal, binormal).pre_rotate_x(self.total_twist(w));
        if let Some(offset) = self.adjustments.position_at(w) {
            frame = frame.pre_translate(offset);
        }
        frame.pre_scale(self.total_scale(w))
    }

    /// Frame without orientation: optional diagonal scale and a translation.
    #[must_use]
    pub fn compose_unoriented(&self, point: Point3, w: f64) -> Transform {
        let translation = point.to_vec3() + self.adjustments.position_at(w).unwrap_or(Vec3::ZERO);
        let frame = Transform::translate(translation);
        match self.adjustments.scale_at(w) {
            Some(scale) => frame.pre_scale(scale),
            None => frame,
        }
    }

    /// Output frames for `samples`.
    ///
    /// With the ribbon enabled every sample is adjusted so the cached tangent, normal and binormal
    /// arrays describe the final ribbon; only every `subdivisions + 1`-th sample becomes an output.
    pub fn build(&self, samples: &mut SampledCurve) -> Vec<Transform> {
        if !samples.is_oriented() {
            return (0..samples.sample_count())
                .map(|i| {
                    let w = samples.weight(samples.parameter_index(i));
                    self.compose_unoriented(samples.points[i], w)
                })
                .collect();
        }

        let stride = samples.subdivisions + 1;
        let increment = if self.ribbon { 1 } else { stride };
        let mut frames = Vec::with_capacity(samples.output_count);

        for i in (0..samples.sample_count()).step_by(increment) {
            let frame = self.compose(
                samples.points[i],
                samples.tangents[i],
                samples.normals[i],
                samples.binormals[i],
                samples.weight(i),
            );
            samples.tangents[i] = frame.axis(0);
            samples.normals[i] = frame.axis(1);
            samples.binormals[i] = frame.axis(2);
            if i % stride == 0 {
                frames.push(frame);
            }
        }

        if let Some(lower) = samples.lower_bound.as_mut() {
            *lower = self.adjust_boundary(*lower, 0.0);
        }
        if let Some(upper) = samples.upper_bound.as_mut() {
            *upper = self.adjust_boundary(*upper, 1.0);
        }
        frames
    }

    fn adjust_boundary(&self, boundary: BoundaryFrame, w: f64) -> BoundaryFrame {
        let frame = Transform::from_axes(
            boundary.point,
            boundary.tangent,
            boundary.normal,
            boundary.binormal,
        )
        .pre_rotate_x(self.total_twist(w))
        .pre_scale(self.total_scale(w));
        BoundaryFrame {
            point: boundary.point,
            tangent: frame.axis(0),
            normal: frame.axis(1),
            binormal: frame.axis(2),
        }
    }
}
