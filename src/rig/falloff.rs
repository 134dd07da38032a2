//! Falloff adjustments: a ramp mapped onto the curve's normalized parameter range.

use std::ops::Mul;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geom::Vec3;

use super::ramp::{Interpolation, RampCurve, RampPoint};

/// Below this falloff distance repetition is skipped.
pub const MIN_REPEAT_DISTANCE: f64 = 0.01;
/// Gap separating consecutive repeated blocks so their end vertices never coincide.
const REPEAT_SEAM: f64 = 1e-5;

/// How ramp positions are laid out around the adjustment offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FalloffMode {
    #[default]
    Forward,
    Backward,
    Mirror,
    Center,
}

impl FalloffMode {
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Forward),
            1 => Some(Self::Backward),
            2 => Some(Self::Mirror),
            3 => Some(Self::Center),
            _ => None,
        }
    }

    fn map(self, position: f64, distance: f64, offset: f64) -> [Option<f64>; 2] {
        match self {
            Self::Forward => [Some(position * distance + offset), None],
            Self::Backward => [Some(-position * distance + offset), None],
            Self::Mirror => [
                Some(-0.5 * position * distance + offset),
                Some(0.5 * position * distance + offset),
            ],
            Self::Center => [Some((position - 0.5) * distance + offset), None],
        }
    }
}

/// Mapped falloff ramp evaluated over the normalized curve parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FalloffCurve {
    ramp: RampCurve,
}

impl FalloffCurve {
    /// Map `points` through `mode`, `offset` and `distance`, optionally repeating the result so it
    /// spans the whole `[0, 1]` range.
    #[must_use]
    pub fn build(
        points: &[RampPoint],
        mode: FalloffMode,
        offset: f64,
        distance: f64,
        repeat: bool,
    ) -> Self {
        let mut mapped: Vec<RampPoint> = points
            .iter()
            .flat_map(|point| {
                let position = point.position.clamp(0.0, 1.0);
                let value = point.value.clamp(0.0, 1.0);
                mode.map(position, distance, offset)
                    .into_iter()
                    .flatten()
                    .map(move |mapped| RampPoint::new(mapped, value, point.interpolation))
            })
            .collect();
        mapped.sort_by(|a, b| a.position.total_cmp(&b.position));

        // Reversed segments take their interpolation from the vertex that was their lower bound
        // before mapping.
        if matches!(mode, FalloffMode::Backward | FalloffMode::Mirror) {
            for i in 0..mapped.len().saturating_sub(1) {
                if mapped[i].position >= offset {
                    break;
                }
                mapped[i].interpolation = mapped[i + 1].interpolation;
            }
        }

        if repeat && points.len() >= 2 {
            if distance > MIN_REPEAT_DISTANCE {
                mapped = repeat_blocks(&mapped, distance);
            } else {
                debug!("falloff distance {distance} too small, repeat skipped");
            }
        }

        Self {
            ramp: RampCurve::new(mapped),
        }
    }

    /// Ramp weight at a normalized curve parameter, clamped to `[0, 1]`.
    #[must_use]
    pub fn weight(&self, param: f64) -> f64 {
        self.ramp.value_at(param).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn ramp(&self) -> &RampCurve {
        &self.ramp
    }
}

fn repeat_blocks(block: &[RampPoint], distance: f64) -> Vec<RampPoint> {
    let total = block.len();
    let (Some(first), Some(last)) = (block.first(), block.last()) else {
        return block.to_vec();
    };
    let lower_count = (first.position / distance).ceil().max(0.0) as usize;
    let upper_count = ((1.0 - last.position) / distance).ceil().max(0.0) as usize;

    let mut points = Vec::with_capacity(total * (lower_count + upper_count + 1));
    points.extend_from_slice(block);

    for j in 0..lower_count {
        let shift = distance * (j + 1) as f64;
        points.extend(block.iter().enumerate().map(|(i, p)| {
            let seam = if i == total - 1 { REPEAT_SEAM } else { 0.0 };
            RampPoint::new(p.position - shift - seam, p.value, p.interpolation)
        }));
    }
    for j in 0..upper_count {
        let shift = distance * (j + 1) as f64;
        points.extend(block.iter().enumerate().map(|(i, p)| {
            let seam = if i == 0 { REPEAT_SEAM } else { 0.0 };
            RampPoint::new(p.position + shift + seam, p.value, p.interpolation)
        }));
    }

    // Step from the end of each block into the start of the next.
    for point in points.iter_mut().skip(total - 1).step_by(total) {
        point.interpolation = Interpolation::None;
    }

    debug!(
        "falloff repeated {lower_count} block(s) below and {upper_count} above, {} vertices",
        points.len()
    );
    points
}

/// Ramp-weighted contribution of a single adjustment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Adjustment<V> {
    pub falloff: FalloffCurve,
    pub value: V,
}

impl<V: Copy + Mul<f64, Output = V>> Adjustment<V> {
    #[must_use]
    pub fn weighted(&self, param: f64) -> V {
        self.value * self.falloff.weight(param)
    }
}

pub type TwistAdjustment = Adjustment<f64>;
pub type ScaleAdjustment = Adjustment<Vec3>;
pub type PositionAdjustment = Adjustment<Vec3>;

/// Enabled adjustment groups of a node, rebuilt wholesale from its configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdjustmentSet {
    pub twist: Option<Vec<TwistAdjustment>>,
    pub scale: Option<Vec<ScaleAdjustment>>,
    pub position: Option<Vec<PositionAdjustment>>,
}

impl AdjustmentSet {
    /// `Σ ramp_i(w)·angle_i`, zero when twist adjustments are disabled.
    #[must_use]
    pub fn twist_at(&self, param: f64) -> f64 {
        self.twist
            .iter()
            .flatten()
            .map(|adjustment| adjustment.weighted(param))
            .sum()
    }

    /// `(1, 1, 1) + Σ ramp_i(w)·vec_i`, or `None` when scale adjustments are disabled.
    #[must_use]
    pub fn scale_at(&self, param: f64) -> Option<Vec3> {
        self.scale.as_ref().map(|adjustments| {
            adjustments
                .iter()
                .fold(Vec3::ONE, |acc, adjustment| acc + adjustment.weighted(param))
        })
    }

    /// `Σ ramp_i(w)·vec_i`, or `None` when position adjustments are disabled.
    #[must_use]
    pub fn position_at(&self, param: f64) -> Option<Vec3> {
        self.position.as_ref().map(|adjustments| {
            adjustments
                .iter()
                .fold(Vec3::ZERO, |acc, adjustment| acc + adjustment.weighted(param))
        })
    }
}
