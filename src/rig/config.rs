//! Serializable node configuration.
//!
//! Every descriptor deserializes from partial input, filling gaps with the node defaults.
//! Out-of-range values are clamped by `sanitized()` instead of rejected.

use std::ops::Mul;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::geom::{Point3, RotateOrder, Vec3};

use super::chain::ChainParameterization;
use super::falloff::{Adjustment, AdjustmentSet, FalloffCurve, FalloffMode};
use super::ramp::{Interpolation, RampPoint};

pub const MIN_OUTPUT_COUNT: usize = 2;
pub const MAX_OUTPUT_COUNT: usize = 500;
pub const MAX_SUBDIVISIONS: usize = 100;

/// Twist inputs in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TwistInputs {
    pub start_twist: f64,
    pub end_twist: f64,
    pub counter_twist: f64,
    pub counter_twist_blend: f64,
    pub roll: f64,
}

impl TwistInputs {
    /// `end·w + start·(1-w) - counter·w·blend + roll`.
    #[must_use]
    pub fn twist_at(&self, w: f64) -> f64 {
        self.end_twist * w + self.start_twist * (1.0 - w) - self.counter_twist * w * self.counter_twist_blend
            + self.roll
    }
}

/// Optional replacement for the shared up vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpVectorOverride {
    pub enabled: bool,
    pub vector: Vec3,
}

impl Default for UpVectorOverride {
    fn default() -> Self {
        Self {
            enabled: false,
            vector: Vec3::Y,
        }
    }
}

impl UpVectorOverride {
    /// The override when enabled, else `up`; normalized.
    #[must_use]
    pub fn resolve(&self, up: Vec3) -> Vec3 {
        let chosen = if self.enabled { self.vector } else { up };
        chosen.normalized_or(Vec3::Y)
    }
}

/// One falloff adjustment as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    default,
    rename_all = "camelCase",
    bound(deserialize = "V: Deserialize<'de> + Default")
)]
pub struct AdjustmentDescriptor<V> {
    pub ramp: Vec<RampPoint>,
    pub value: V,
    pub offset: f64,
    pub falloff_mode: FalloffMode,
    pub falloff_distance: f64,
    pub repeat: bool,
}

impl<V: Default> Default for AdjustmentDescriptor<V> {
    fn default() -> Self {
        Self {
            ramp: vec![
                RampPoint::new(0.0, 1.0, Interpolation::Linear),
                RampPoint::new(1.0, 0.0, Interpolation::Linear),
            ],
            value: V::default(),
            offset: 0.0,
            falloff_mode: FalloffMode::Forward,
            falloff_distance: 1.0,
            repeat: false,
        }
    }
}

impl<V: Copy> AdjustmentDescriptor<V> {
    #[must_use]
    pub fn build(&self) -> Adjustment<V> {
        Adjustment {
            falloff: FalloffCurve::build(
                &self.ramp,
                self.falloff_mode,
                self.offset,
                self.falloff_distance,
                self.repeat,
            ),
            value: self.value,
        }
    }
}

/// Adjustments of one kind plus their enable switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    default,
    bound(deserialize = "V: Deserialize<'de> + Default")
)]
pub struct AdjustmentGroup<V> {
    pub enabled: bool,
    pub adjustments: Vec<AdjustmentDescriptor<V>>,
}

impl<V> Default for AdjustmentGroup<V> {
    fn default() -> Self {
        Self {
            enabled: false,
            adjustments: Vec::new(),
        }
    }
}

impl<V: Copy + Mul<f64, Output = V>> AdjustmentGroup<V> {
    /// Built adjustments, `None` when the group is disabled.
    #[must_use]
    pub fn build(&self) -> Option<Vec<Adjustment<V>>> {
        self.enabled
            .then(|| self.adjustments.iter().map(AdjustmentDescriptor::build).collect())
    }

    fn sanitize(&mut self) {
        for adjustment in &mut self.adjustments {
            if adjustment.falloff_distance < 0.0 {
                warn!(
                    "negative falloff distance {} clamped to 0",
                    adjustment.falloff_distance
                );
                adjustment.falloff_distance = 0.0;
            }
        }
    }
}

/// Inputs shared by every node variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RigSettings {
    pub up_vector: Vec3,
    pub normal_up_override: UpVectorOverride,
    pub counter_twist_up_override: UpVectorOverride,
    pub compute_orientation: bool,
    pub discard_last_output: bool,
    pub rotate_order: RotateOrder,
    /// Output frame count; the instancer's instance count.
    #[serde(alias = "instanceCount")]
    pub output_count: usize,
    pub subdivisions: usize,
    pub twist: TwistInputs,
    pub draw_ribbon: bool,
    pub twist_adjustments: AdjustmentGroup<f64>,
    pub scale_adjustments: AdjustmentGroup<Vec3>,
}

impl Default for RigSettings {
    fn default() -> Self {
        Self {
            up_vector: Vec3::Y,
            normal_up_override: UpVectorOverride::default(),
            counter_twist_up_override: UpVectorOverride::default(),
            compute_orientation: true,
            discard_last_output: false,
            rotate_order: RotateOrder::Xyz,
            output_count: 10,
            subdivisions: 20,
            twist: TwistInputs::default(),
            draw_ribbon: true,
            twist_adjustments: AdjustmentGroup::default(),
            scale_adjustments: AdjustmentGroup::default(),
        }
    }
}

impl RigSettings {
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.output_count = clamp_logged(
            "outputCount",
            self.output_count,
            MIN_OUTPUT_COUNT,
            MAX_OUTPUT_COUNT,
        );
        self.subdivisions = clamp_logged("subdivisions", self.subdivisions, 0, MAX_SUBDIVISIONS);
        self.twist.counter_twist_blend =
            clamp_blend("counterTwistBlend", self.twist.counter_twist_blend);
        self.twist_adjustments.sanitize();
        self.scale_adjustments.sanitize();
        self
    }

    /// Up vector seeding the normal transport.
    #[must_use]
    pub fn normal_up(&self) -> Vec3 {
        self.normal_up_override.resolve(self.up_vector)
    }

    /// Up vector the counter-twist solver measures against.
    #[must_use]
    pub fn counter_twist_up(&self) -> Vec3 {
        self.counter_twist_up_override.resolve(self.up_vector)
    }

    /// Frames emitted after honouring `discard_last_output`.
    #[must_use]
    pub fn emitted_count(&self) -> usize {
        if self.discard_last_output {
            self.output_count.saturating_sub(1)
        } else {
            self.output_count
        }
    }

    /// Twist adjustments only apply to oriented frames.
    #[must_use]
    pub fn adjustments(&self, position: Option<&AdjustmentGroup<Vec3>>) -> AdjustmentSet {
        AdjustmentSet {
            twist: if self.compute_orientation {
                self.twist_adjustments.build()
            } else {
                None
            },
            scale: self.scale_adjustments.build(),
            position: position.and_then(AdjustmentGroup::build),
        }
    }
}

/// B-spline spine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpineConfig {
    pub control_points: Vec<Point3>,
    pub close_curve: bool,
    pub parameterization_blend: f64,
    #[serde(flatten)]
    pub rig: RigSettings,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            control_points: Vec::new(),
            close_curve: false,
            parameterization_blend: 1.0,
            rig: RigSettings::default(),
        }
    }
}

impl SpineConfig {
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.parameterization_blend =
            clamp_blend("parameterizationBlend", self.parameterization_blend);
        self.rig = self.rig.sanitized();
        self
    }
}

/// T-Bezier chain through a root, one to three joints and an end point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainConfig {
    /// Root, joints, end.
    pub points: Vec<Point3>,
    pub joint_offset: f64,
    pub joint_radius: f64,
    pub joint_volumes: Vec<f64>,
    pub parameterization: ChainParameterization,
    #[serde(flatten)]
    pub rig: RigSettings,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            joint_offset: 0.0,
            joint_radius: 10.0,
            joint_volumes: Vec::new(),
            parameterization: ChainParameterization::SplitLength,
            rig: RigSettings::default(),
        }
    }
}

impl ChainConfig {
    /// Fit the point and volume lists to `joint_count` joints.
    #[must_use]
    pub fn sanitized(mut self, joint_count: usize) -> Self {
        let point_count = joint_count + 2;
        if self.points.len() != point_count {
            warn!(
                "chain with {joint_count} joint(s) expects {point_count} points, got {}",
                self.points.len()
            );
            self.points.resize(point_count, Point3::ORIGIN);
        }
        self.joint_volumes.resize(joint_count, 0.0);
        for volume in &mut self.joint_volumes {
            *volume = volume.clamp(-1.0, 1.0);
        }
        self.rig = self.rig.sanitized();
        self
    }
}

/// Spine distributing instances with an offset that slides them along the curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstancerConfig {
    pub control_points: Vec<Point3>,
    pub close_curve: bool,
    pub parameterization_blend: f64,
    pub offset: f64,
    pub position_adjustments: AdjustmentGroup<Vec3>,
    #[serde(flatten)]
    pub rig: RigSettings,
}

impl Default for InstancerConfig {
    fn default() -> Self {
        Self {
            control_points: Vec::new(),
            close_curve: false,
            parameterization_blend: 1.0,
            offset: 0.0,
            position_adjustments: AdjustmentGroup::default(),
            rig: RigSettings::default(),
        }
    }
}

impl InstancerConfig {
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.parameterization_blend =
            clamp_blend("parameterizationBlend", self.parameterization_blend);
        if !self.offset.is_finite() {
            warn!("offset {} replaced by 0", self.offset);
            self.offset = 0.0;
        }
        self.position_adjustments.sanitize();
        self.rig = self.rig.sanitized();
        self
    }
}

/// Clamp a blend into `[0, 1]`; non-finite input becomes `0`.
fn clamp_blend(name: &str, value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        warn!("{name} {value} replaced by 0");
        0.0
    }
}

fn clamp_logged(name: &str, value: usize, min: usize, max: usize) -> usize {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{name} {value} clamped to {clamped}");
    }
    clamped
}
