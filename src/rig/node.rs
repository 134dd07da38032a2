//! Node facade: one configuration, its cached curve and samples, and the output channels.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::geom::{Curve3, PiecewiseTBezier, Point3, Transform, Vec3, euler_from_transform};

use super::RigError;
use super::chain::{ChainSettings, JointGeometry, build_chain_curve, sample_chain};
use super::config::{
    AdjustmentGroup, ChainConfig, InstancerConfig, RigSettings, SpineConfig, TwistInputs,
};
use super::counter_twist::EndFrame;
use super::falloff::AdjustmentSet;
use super::frame_builder::FrameBuilder;
use super::instancer::{InstancerSettings, sample_instancer};
use super::sampler::{CurveSampler, SampleSettings, SampledCurve};
use super::state::EvalState;

/// Node variant and its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    Spine(SpineConfig),
    ChainSingle(ChainConfig),
    ChainDouble(ChainConfig),
    ChainTriple(ChainConfig),
    Instancer(InstancerConfig),
}

impl NodeKind {
    /// Joints of a chain variant, `None` for curve-driven variants.
    #[must_use]
    pub const fn joint_count(&self) -> Option<usize> {
        match self {
            Self::ChainSingle(_) => Some(1),
            Self::ChainDouble(_) => Some(2),
            Self::ChainTriple(_) => Some(3),
            Self::Spine(_) | Self::Instancer(_) => None,
        }
    }

    #[must_use]
    pub const fn rig(&self) -> &RigSettings {
        match self {
            Self::Spine(config) => &config.rig,
            Self::ChainSingle(config) | Self::ChainDouble(config) | Self::ChainTriple(config) => {
                &config.rig
            }
            Self::Instancer(config) => &config.rig,
        }
    }

    pub fn rig_mut(&mut self) -> &mut RigSettings {
        match self {
            Self::Spine(config) => &mut config.rig,
            Self::ChainSingle(config) | Self::ChainDouble(config) | Self::ChainTriple(config) => {
                &mut config.rig
            }
            Self::Instancer(config) => &mut config.rig,
        }
    }

    /// Clamp every input into its accepted range.
    #[must_use]
    pub fn sanitized(self) -> Self {
        match self {
            Self::Spine(config) => Self::Spine(config.sanitized()),
            Self::ChainSingle(config) => Self::ChainSingle(config.sanitized(1)),
            Self::ChainDouble(config) => Self::ChainDouble(config.sanitized(2)),
            Self::ChainTriple(config) => Self::ChainTriple(config.sanitized(3)),
            Self::Instancer(config) => Self::Instancer(config.sanitized()),
        }
    }

    fn position_adjustments(&self) -> Option<&AdjustmentGroup<Vec3>> {
        match self {
            Self::Instancer(config) => Some(&config.position_adjustments),
            _ => None,
        }
    }
}

/// Display geometry for a viewport.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawData {
    /// Curve polyline from the lower to the upper bound.
    pub curve: Vec<Point3>,
    pub hull: Vec<Point3>,
    /// One segment per sample along its final normal.
    pub normals: Vec<[Point3; 2]>,
    /// One segment per sample across its final binormal; empty when the ribbon is off.
    pub ribbon: Vec<[Point3; 2]>,
}

#[derive(Debug, Clone)]
struct ChainCurve {
    curve: PiecewiseTBezier,
    joints: Vec<JointGeometry>,
}

/// A rig node: evaluates its configuration into output frames on demand.
#[derive(Debug, Clone)]
pub struct FlexiNode {
    kind: NodeKind,
    adjustments: AdjustmentSet,
    state: EvalState,
    sampler: CurveSampler,
    chain: Option<ChainCurve>,
    samples: SampledCurve,
    frames: Vec<Transform>,
}

impl FlexiNode {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        let kind = kind.sanitized();
        let adjustments = kind.rig().adjustments(kind.position_adjustments());
        Self {
            kind,
            adjustments,
            state: EvalState::default(),
            sampler: CurveSampler::new(),
            chain: None,
            samples: SampledCurve::default(),
            frames: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[must_use]
    pub const fn state(&self) -> EvalState {
        self.state
    }

    /// Times the spine's knot vector was rebuilt.
    #[must_use]
    pub const fn knot_builds(&self) -> usize {
        self.sampler.knot_builds()
    }

    /// Joint geometry of the last chain evaluation.
    #[must_use]
    pub fn joints(&self) -> &[JointGeometry] {
        self.chain.as_ref().map_or(&[], |chain| &chain.joints)
    }

    /// Replace the whole configuration.
    pub fn set_kind(&mut self, kind: NodeKind) {
        self.update(|current| *current = kind);
    }

    /// Edit the configuration in place; the node re-sanitizes and goes stale.
    pub fn update(&mut self, edit: impl FnOnce(&mut NodeKind)) {
        let mut kind = std::mem::replace(&mut self.kind, NodeKind::Spine(SpineConfig::default()));
        edit(&mut kind);
        self.kind = kind.sanitized();
        self.adjustments = self
            .kind
            .rig()
            .adjustments(self.kind.position_adjustments());
        self.state = self.state.on_input_changed();
    }

    /// Control points of a curve variant, or root, joints and end of a chain.
    pub fn set_points(&mut self, points: Vec<Point3>) {
        self.update(|kind| match kind {
            NodeKind::Spine(config) => config.control_points = points,
            NodeKind::Instancer(config) => config.control_points = points,
            NodeKind::ChainSingle(config)
            | NodeKind::ChainDouble(config)
            | NodeKind::ChainTriple(config) => config.points = points,
        });
    }

    pub fn set_twist(&mut self, twist: TwistInputs) {
        self.update(|kind| kind.rig_mut().twist = twist);
    }

    /// Recompute samples and frames when stale.
    pub fn evaluate(&mut self) -> Result<(), RigError> {
        if !self.state.needs_evaluation() {
            return Ok(());
        }
        let rig = self.kind.rig();
        let normal_up = rig.normal_up();
        let orient = rig.compute_orientation;

        let mut samples = match &self.kind {
            NodeKind::Spine(config) => {
                if config.control_points.is_empty() {
                    return Err(RigError::InvalidConfig("spine has no control points".into()));
                }
                self.sampler.sample(
                    &config.control_points,
                    &SampleSettings {
                        closed: config.close_curve,
                        output_count: rig.output_count,
                        subdivisions: rig.subdivisions,
                        blend: config.parameterization_blend,
                        normal_up,
                        orient,
                    },
                )?
            }
            NodeKind::ChainSingle(config)
            | NodeKind::ChainDouble(config)
            | NodeKind::ChainTriple(config) => {
                let (curve, joints) = build_chain_curve(
                    &config.points,
                    config.joint_offset,
                    config.joint_radius,
                    &config.joint_volumes,
                );
                let samples = sample_chain(
                    &curve,
                    &joints,
                    &ChainSettings {
                        output_count: rig.output_count,
                        subdivisions: rig.subdivisions,
                        normal_up,
                        orient,
                        parameterization: config.parameterization,
                    },
                )?;
                self.chain = Some(ChainCurve { curve, joints });
                samples
            }
            NodeKind::Instancer(config) => {
                if config.control_points.is_empty() {
                    return Err(RigError::InvalidConfig(
                        "instancer has no control points".into(),
                    ));
                }
                sample_instancer(
                    &mut self.sampler,
                    &config.control_points,
                    &InstancerSettings {
                        closed: config.close_curve,
                        instance_count: rig.output_count,
                        subdivisions: rig.subdivisions,
                        blend: config.parameterization_blend,
                        offset: config.offset,
                        normal_up,
                        orient,
                    },
                )?
            }
        };

        let frames =
            FrameBuilder::new(&rig.twist, &self.adjustments, rig.draw_ribbon).build(&mut samples);
        debug!(
            "evaluated {} frame(s) from {} sample(s)",
            frames.len(),
            samples.params.len()
        );
        self.samples = samples;
        self.frames = frames;
        self.state = self.state.on_evaluate();
        Ok(())
    }

    fn evaluated(&self) -> Result<&SampledCurve, RigError> {
        if self.state.needs_evaluation() {
            Err(RigError::NoOutput)
        } else {
            Ok(&self.samples)
        }
    }

    fn curve(&self) -> Option<&dyn Curve3> {
        match (&self.kind, &self.chain) {
            (NodeKind::Spine(_) | NodeKind::Instancer(_), _) => {
                self.sampler.curve().map(|curve| curve as &dyn Curve3)
            }
            (_, Some(chain)) => Some(&chain.curve as &dyn Curve3),
            (_, None) => None,
        }
    }

    /// Samples of the last evaluation.
    pub fn samples(&self) -> Result<&SampledCurve, RigError> {
        self.evaluated()
    }

    /// Output frames in curve space, without the last one when it is discarded.
    pub fn local_frames(&self) -> Result<&[Transform], RigError> {
        self.evaluated()?;
        let count = self.kind.rig().emitted_count().min(self.frames.len());
        Ok(&self.frames[..count])
    }

    /// Output frames composed with the node's world transform.
    pub fn world_frames(&self, world: &Transform) -> Result<Vec<Transform>, RigError> {
        Ok(self
            .local_frames()?
            .iter()
            .map(|frame| world.compose(*frame))
            .collect())
    }

    pub fn local_positions(&self) -> Result<Vec<Point3>, RigError> {
        Ok(positions(self.local_frames()?))
    }

    pub fn world_positions(&self, world: &Transform) -> Result<Vec<Point3>, RigError> {
        Ok(positions(&self.world_frames(world)?))
    }

    /// Euler rotations in radians, in the configured rotate order.
    pub fn local_rotations(&self) -> Result<Vec<Vec3>, RigError> {
        Ok(self.rotations(self.local_frames()?))
    }

    pub fn world_rotations(&self, world: &Transform) -> Result<Vec<Vec3>, RigError> {
        Ok(self.rotations(&self.world_frames(world)?))
    }

    pub fn local_scales(&self) -> Result<Vec<Vec3>, RigError> {
        Ok(self.local_frames()?.iter().map(Transform::axis_lengths).collect())
    }

    pub fn world_scales(&self, world: &Transform) -> Result<Vec<Vec3>, RigError> {
        let parent = world.axis_lengths();
        Ok(self
            .local_frames()?
            .iter()
            .map(|frame| frame.axis_lengths().mul_elem(parent))
            .collect())
    }

    fn rotations(&self, frames: &[Transform]) -> Vec<Vec3> {
        let order = self.kind.rig().rotate_order;
        frames
            .iter()
            .map(|frame| euler_from_transform(frame, order))
            .collect()
    }

    /// Dot product of the normal-up vector and the unit curve tangent at the lower bound.
    ///
    /// Values near `1` or `-1` mean the up vector barely constrains the starting normal.
    pub fn normal_stability(&self) -> Result<f64, RigError> {
        let up = self.kind.rig().normal_up();
        self.stability(up, |lower, _| lower)
    }

    /// Dot product of the counter-twist up vector and the unit curve tangent at the upper bound.
    pub fn counter_twist_stability(&self) -> Result<f64, RigError> {
        let up = self.kind.rig().counter_twist_up();
        self.stability(up, |_, upper| upper)
    }

    fn stability(&self, up: Vec3, pick: impl Fn(f64, f64) -> f64) -> Result<f64, RigError> {
        if !self.kind.rig().compute_orientation {
            return Err(RigError::OrientationDisabled);
        }
        let samples = self.evaluated()?;
        let curve = self.curve().ok_or(RigError::NoOutput)?;
        let tangent = curve
            .tangent_at(pick(samples.lower, samples.upper))
            .unwrap_or(Vec3::X);
        Ok(up.dot(tangent))
    }

    /// Untwisted tangent and normal at the upper bound.
    pub fn end_frame(&self) -> Result<EndFrame, RigError> {
        let samples = self.evaluated()?;
        let normal = samples.end_normal.ok_or(RigError::OrientationDisabled)?;
        let curve = self.curve().ok_or(RigError::NoOutput)?;
        let tangent = curve
            .tangent_at(samples.upper)
            .or_else(|| samples.tangents.last().copied())
            .unwrap_or(Vec3::X);
        Ok(EndFrame { tangent, normal })
    }

    /// Viewport geometry; marks the node drawn.
    pub fn draw_data(&mut self) -> Result<DrawData, RigError> {
        let samples = self.evaluated()?;
        let mut data = DrawData {
            hull: samples.hull.clone(),
            ..DrawData::default()
        };

        if let Some(lower) = samples.lower_bound {
            data.curve.push(lower.point);
        }
        let count = samples.sample_count();
        let ordered = (samples.min_index..count).chain(1.min(count)..samples.min_index);
        for i in ordered {
            let point = samples.points[i];
            if data.curve.last() != Some(&point) {
                data.curve.push(point);
            }
        }
        if let Some(upper) = samples.upper_bound {
            if data.curve.last() != Some(&upper.point) {
                data.curve.push(upper.point);
            }
        }

        if samples.is_oriented() {
            let ribbon = self.kind.rig().draw_ribbon;
            for i in 0..count {
                let point = samples.points[i];
                data.normals.push([point, point + samples.normals[i]]);
                if ribbon {
                    let half = samples.binormals[i] * 0.5;
                    data.ribbon.push([point + -half, point + half]);
                }
            }
        }

        self.state = self.state.on_draw();
        Ok(data)
    }
}

fn positions(frames: &[Transform]) -> Vec<Point3> {
    frames
        .iter()
        .map(|frame| Point3::from(frame.translation()))
        .collect()
}

/// Evaluate every stale node, in parallel when the `parallel` feature is enabled.
pub fn evaluate_all(nodes: &mut [FlexiNode]) -> Vec<Result<(), RigError>> {
    let results: Vec<Result<(), RigError>>;
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        results = nodes.par_iter_mut().map(FlexiNode::evaluate).collect();
    }
    #[cfg(not(feature = "parallel"))]
    {
        results = nodes.iter_mut().map(FlexiNode::evaluate).collect();
    }
    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        warn!("{failed} of {} node(s) failed to evaluate", nodes.len());
    }
    results
}
