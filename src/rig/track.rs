//! Keyed control-point poses that drive a node over time.

use serde::{Deserialize, Serialize};

use crate::geom::Point3;

/// Control points of a node at one time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseKey {
    pub time: f64,
    pub points: Vec<Point3>,
}

/// Poses sorted by time, sampled with per-point linear interpolation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointTrack {
    keys: Vec<PoseKey>,
}

impl PointTrack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn keys(&self) -> &[PoseKey] {
        &self.keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a pose, replacing any pose at the same time.
    pub fn set_key(&mut self, key: PoseKey) {
        match self
            .keys
            .binary_search_by(|existing| existing.time.total_cmp(&key.time))
        {
            Ok(index) => self.keys[index] = key,
            Err(index) => self.keys.insert(index, key),
        }
    }

    /// Pose at `time`, or `None` for an empty track.
    ///
    /// Held flat outside the keyed range. Neighbouring poses with different point counts step to
    /// the earlier pose.
    #[must_use]
    pub fn sample(&self, time: f64) -> Option<Vec<Point3>> {
        let (first, last) = (self.keys.first()?, self.keys.last()?);
        if time <= first.time {
            return Some(first.points.clone());
        }
        if time >= last.time {
            return Some(last.points.clone());
        }
        let upper = self.keys.partition_point(|key| key.time <= time);
        let (a, b) = (&self.keys[upper - 1], &self.keys[upper]);
        if a.points.len() != b.points.len() {
            return Some(a.points.clone());
        }
        let u = (time - a.time) / (b.time - a.time);
        Some(
            a.points
                .iter()
                .zip(&b.points)
                .map(|(p, q)| p.lerp(*q, u))
                .collect(),
        )
    }
}
