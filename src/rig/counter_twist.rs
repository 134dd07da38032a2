//! Counter-twist solver.
//!
//! Steps a node through a time range, measures how far the rotation-minimizing normal at the end
//! of the curve has rotated away from the counter-twist up vector, and keys the accumulated,
//! unwrapped angle so that feeding it back as counter twist locks the end frame to the up vector.

use std::f64::consts::{PI, TAU};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::geom::Vec3;

use super::RigError;
use super::node::FlexiNode;
use super::time::{TimeContext, TimeGuard};

/// Smallest accepted time step.
pub const MIN_TIME_STEP: f64 = 0.01;

/// Most time steps a single solve may walk.
pub const MAX_TIME_STEPS: usize = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("time step {0} is below the minimum of {MIN_TIME_STEP}")]
    InvalidTimeStep(f64),
    #[error("invalid time range [{start}, {end}]")]
    InvalidTimeRange { start: f64, end: f64 },
    #[error("time range needs {steps} steps, more than the maximum of {MAX_TIME_STEPS}")]
    TooManySteps { steps: f64 },
    #[error("counter twist requires orientation to be enabled")]
    OrientationDisabled,
    #[error("evaluation failed at time {time}: {source}")]
    Evaluation {
        time: f64,
        #[source]
        source: RigError,
    },
    #[error("failed to write keyframes: {0}")]
    KeyframeWrite(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f64,
    pub value: f64,
}

/// Destination of solved keys. `commit` receives the complete key set at once.
pub trait KeyframeStore {
    fn commit(&mut self, keys: &[Keyframe]) -> Result<(), String>;
}

/// In-memory animation curve with linear tangents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimCurve {
    keys: Vec<Keyframe>,
}

impl AnimCurve {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Insert a key, replacing any key at the same time.
    pub fn set_key(&mut self, key: Keyframe) {
        match self
            .keys
            .binary_search_by(|probe| probe.time.total_cmp(&key.time))
        {
            Ok(index) => self.keys[index] = key,
            Err(index) => self.keys.insert(index, key),
        }
    }

    /// Linearly interpolated value; flat before the first and after the last key.
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }
        let upper = self.keys.partition_point(|k| k.time <= time);
        let (a, b) = (self.keys[upper - 1], self.keys[upper]);
        let u = (time - a.time) / (b.time - a.time);
        a.value + (b.value - a.value) * u
    }
}

impl KeyframeStore for AnimCurve {
    fn commit(&mut self, keys: &[Keyframe]) -> Result<(), String> {
        if let Some(bad) = keys.iter().find(|k| !k.time.is_finite() || !k.value.is_finite()) {
            return Err(format!("non-finite key at time {}", bad.time));
        }
        for &key in keys {
            self.set_key(key);
        }
        Ok(())
    }
}

/// Untwisted frame at the upper bound of a node's curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndFrame {
    pub tangent: Vec3,
    pub normal: Vec3,
}

/// A node whose inputs follow the scene time.
pub trait CurveProvider {
    fn is_orient_enabled(&self) -> bool;
    fn counter_twist_up(&self) -> Vec3;
    /// Re-evaluate at `time` and report the untwisted end frame.
    fn end_frame_at(&mut self, time: f64) -> Result<EndFrame, RigError>;
}

impl CurveProvider for FlexiNode {
    fn is_orient_enabled(&self) -> bool {
        self.kind().rig().compute_orientation
    }

    fn counter_twist_up(&self) -> Vec3 {
        self.kind().rig().counter_twist_up()
    }

    fn end_frame_at(&mut self, _time: f64) -> Result<EndFrame, RigError> {
        self.evaluate()?;
        self.end_frame()
    }
}

/// Node driven by an animation callback that rewrites its inputs for a given time.
pub struct AnimatedNode<F> {
    pub node: FlexiNode,
    animate: F,
}

impl<F: FnMut(f64, &mut FlexiNode)> AnimatedNode<F> {
    pub fn new(node: FlexiNode, animate: F) -> Self {
        Self { node, animate }
    }

    /// Apply the animation at `time` and evaluate.
    pub fn evaluate_at(&mut self, time: f64) -> Result<(), RigError> {
        (self.animate)(time, &mut self.node);
        self.node.evaluate()
    }
}

impl<F: FnMut(f64, &mut FlexiNode)> CurveProvider for AnimatedNode<F> {
    fn is_orient_enabled(&self) -> bool {
        self.node.is_orient_enabled()
    }

    fn counter_twist_up(&self) -> Vec3 {
        CurveProvider::counter_twist_up(&self.node)
    }

    fn end_frame_at(&mut self, time: f64) -> Result<EndFrame, RigError> {
        self.evaluate_at(time)?;
        self.node.end_frame()
    }
}

/// Signed angle from `up`, projected onto the plane normal to `tangent`, to `normal`.
///
/// Positive when `normal` lies clockwise of the projection looking down the tangent.
#[must_use]
pub fn signed_twist_angle(up: Vec3, tangent: Vec3, normal: Vec3) -> f64 {
    let projected = (up - tangent * up.dot(tangent))
        .normalized()
        .unwrap_or_else(|| {
            warn!("counter-twist up vector parallel to the end tangent");
            tangent.any_perpendicular()
        });
    let direction = if projected.cross(normal).dot(tangent) < 0.0 {
        1.0
    } else {
        -1.0
    };
    projected.dot(normal).clamp(-1.0, 1.0).acos() * direction
}

/// Change between consecutive angles, taking the short way around when they straddle `±π`.
#[must_use]
pub fn unwrapped_delta(current: f64, previous: f64) -> f64 {
    let delta = current - previous;
    if delta.abs() > PI {
        if current > 0.0 { delta - TAU } else { delta + TAU }
    } else {
        delta
    }
}

/// Time range the solver walks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterTwistSolver {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl CounterTwistSolver {
    #[must_use]
    pub const fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    pub fn validate<P: CurveProvider + ?Sized>(&self, provider: &P) -> Result<(), SolverError> {
        if !(self.step >= MIN_TIME_STEP) {
            return Err(SolverError::InvalidTimeStep(self.step));
        }
        if !self.start.is_finite() || !self.end.is_finite() || self.end < self.start {
            return Err(SolverError::InvalidTimeRange {
                start: self.start,
                end: self.end,
            });
        }
        let steps = self.step_count();
        if !(steps <= MAX_TIME_STEPS as f64) {
            return Err(SolverError::TooManySteps { steps });
        }
        if !provider.is_orient_enabled() {
            return Err(SolverError::OrientationDisabled);
        }
        Ok(())
    }

    fn step_count(&self) -> f64 {
        ((self.end - self.start) / self.step + 1e-9).floor()
    }

    /// Sample times `start, start + step, ..` up to and including `end`.
    ///
    /// Empty when the range is invalid or needs more than [`MAX_TIME_STEPS`] steps.
    #[must_use]
    pub fn times(&self) -> Vec<f64> {
        let steps = self.step_count();
        if !(0.0..=MAX_TIME_STEPS as f64).contains(&steps) {
            return Vec::new();
        }
        (0..=steps as usize)
            .map(|i| self.start + self.step * i as f64)
            .collect()
    }

    /// Solve and commit the keys in one batch.
    ///
    /// The scene time is restored on return, whether the solve succeeded or not. Nothing is
    /// written to `store` unless every step evaluated.
    pub fn solve<P, T, S>(
        &self,
        provider: &mut P,
        time: &mut T,
        store: &mut S,
    ) -> Result<Vec<Keyframe>, SolverError>
    where
        P: CurveProvider + ?Sized,
        T: TimeContext + ?Sized,
        S: KeyframeStore + ?Sized,
    {
        self.validate(provider)?;
        let mut guard = TimeGuard::new(time);

        let mut previous = 0.0;
        let mut total = 0.0;
        let mut keys = Vec::new();
        for t in self.times() {
            guard.set_time(t);
            let end = provider
                .end_frame_at(guard.time())
                .map_err(|source| SolverError::Evaluation { time: t, source })?;
            // The up vector may itself be animated.
            let up = provider.counter_twist_up();
            let angle = signed_twist_angle(up, end.tangent, end.normal);
            total -= unwrapped_delta(angle, previous);
            previous = angle;
            debug!("counter twist at {t}: angle {angle}, accumulated {total}");
            keys.push(Keyframe { time: t, value: total });
        }

        store.commit(&keys).map_err(SolverError::KeyframeWrite)?;
        info!(
            "solved {} counter-twist key(s) over [{}, {}], time restored to {}",
            keys.len(),
            self.start,
            self.end,
            guard.saved()
        );
        Ok(keys)
    }
}
