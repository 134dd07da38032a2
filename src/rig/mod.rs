//! Rig layer: sampling, frame construction, falloff adjustments and the node variants built on
//! the curve geometry in [`crate::geom`].

pub mod chain;
pub mod config;
pub mod counter_twist;
pub mod falloff;
pub mod frame_builder;
pub mod instancer;
pub mod node;
pub mod ramp;
pub mod sampler;
pub mod state;
pub mod time;
pub mod track;

use crate::geom::CurveError;

pub use chain::{ChainParameterization, JointGeometry};
pub use config::{
    AdjustmentDescriptor, AdjustmentGroup, ChainConfig, InstancerConfig, RigSettings,
    SpineConfig, TwistInputs, UpVectorOverride,
};
pub use counter_twist::{
    AnimCurve, AnimatedNode, CounterTwistSolver, CurveProvider, EndFrame, Keyframe,
    KeyframeStore, SolverError,
};
pub use falloff::{AdjustmentSet, FalloffCurve, FalloffMode};
pub use node::{DrawData, FlexiNode, NodeKind, evaluate_all};
pub use ramp::{Interpolation, RampCurve, RampPoint};
pub use sampler::{BoundaryFrame, SampledCurve};
pub use state::EvalState;
pub use time::{SceneTime, TimeContext, TimeGuard};
pub use track::{PointTrack, PoseKey};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RigError {
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error("orientation is disabled")]
    OrientationDisabled,
    #[error("node has not been evaluated since its inputs changed")]
    NoOutput,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests;
