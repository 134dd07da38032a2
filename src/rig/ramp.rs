//! One-dimensional ramp curve with per-vertex interpolation.
//!
//! Vertices are sorted on construction and bracketed by two sentinels far outside the unit range
//! that repeat the first and last values, so evaluation outside the authored range extends flat.

use serde::{Deserialize, Serialize};

/// Interpolation used from a vertex up to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    None,
    #[default]
    Linear,
    Smooth,
    Spline,
    MonotoneSpline,
}

impl Interpolation {
    /// Host enum index: `0` none, `1` linear, `2` smooth, `3` spline, `4` monotone spline.
    #[must_use]
    pub const fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::None),
            1 => Some(Self::Linear),
            2 => Some(Self::Smooth),
            3 => Some(Self::Spline),
            4 => Some(Self::MonotoneSpline),
            _ => None,
        }
    }

    #[must_use]
    pub const fn index(self) -> i32 {
        self as i32
    }
}

/// Ramp control vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampPoint {
    pub position: f64,
    pub value: f64,
    pub interpolation: Interpolation,
}

impl RampPoint {
    #[must_use]
    pub const fn new(position: f64, value: f64, interpolation: Interpolation) -> Self {
        Self {
            position,
            value,
            interpolation,
        }
    }
}

impl Default for RampPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, Interpolation::Linear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vertex {
    position: f64,
    value: f64,
    slope: f64,
    interpolation: Interpolation,
}

const SENTINEL: f64 = f64::MAX;

/// Prepared ramp, ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RampCurve {
    vertices: Vec<Vertex>,
}

impl Default for RampCurve {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RampCurve {
    /// Sort the vertices, attach the boundary sentinels and compute spline slopes.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = RampPoint>) -> Self {
        let mut authored: Vec<RampPoint> = points.into_iter().collect();
        authored.sort_by(|a, b| a.position.total_cmp(&b.position));

        let (first, last) = match (authored.first(), authored.last()) {
            (Some(first), Some(last)) => (
                Vertex::sentinel(-SENTINEL, first.value),
                Vertex::sentinel(SENTINEL, last.value),
            ),
            _ => (Vertex::sentinel(0.0, 0.0), Vertex::sentinel(0.0, 0.0)),
        };

        let mut vertices = Vec::with_capacity(authored.len() + 2);
        vertices.push(first);
        vertices.extend(authored.iter().map(|p| Vertex {
            position: p.position,
            value: p.value,
            slope: 0.0,
            interpolation: p.interpolation,
        }));
        vertices.push(last);

        // Catmull-Rom slopes from centred differences.
        for i in 1..vertices.len() - 1 {
            let span = vertices[i + 1].position - vertices[i - 1].position;
            vertices[i].slope = if span == 0.0 {
                0.0
            } else {
                (vertices[i + 1].value - vertices[i - 1].value) / span
            };
        }

        for i in 0..vertices.len() - 1 {
            if vertices[i].interpolation != Interpolation::MonotoneSpline {
                continue;
            }
            let h = vertices[i + 1].position - vertices[i].position;
            if h == 0.0 {
                vertices[i].slope = 0.0;
                vertices[i + 1].slope = 0.0;
                continue;
            }
            let secant = (vertices[i + 1].value - vertices[i].value) / h;
            vertices[i].slope = clamp_slope(vertices[i].slope, secant);
            vertices[i + 1].slope = clamp_slope(vertices[i + 1].slope, secant);
        }

        Self { vertices }
    }

    /// Number of authored vertices, sentinels excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len() - 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Authored vertices in ascending position order.
    pub fn points(&self) -> impl Iterator<Item = RampPoint> + '_ {
        self.vertices[1..self.vertices.len() - 1]
            .iter()
            .map(|v| RampPoint::new(v.position, v.value, v.interpolation))
    }

    #[must_use]
    pub fn value_at(&self, param: f64) -> f64 {
        let count = self.vertices.len();
        let upper = self
            .vertices
            .partition_point(|v| v.position <= param)
            .clamp(1, count - 1);
        let k0 = &self.vertices[upper - 1];
        let k1 = &self.vertices[upper];
        let h = k1.position - k0.position;

        match k0.interpolation {
            Interpolation::None => k0.value,
            _ if h <= 0.0 || !h.is_finite() => k0.value,
            Interpolation::Linear => {
                let u = (param - k0.position) / h;
                k0.value + u * (k1.value - k0.value)
            }
            Interpolation::Smooth => {
                let u = (param - k0.position) / h;
                k0.value * (u - 1.0) * (u - 1.0) * (2.0 * u + 1.0) + k1.value * u * u * (3.0 - 2.0 * u)
            }
            Interpolation::Spline | Interpolation::MonotoneSpline => {
                let x = param - k0.position;
                let delta = k1.value - k0.value;
                let (d1, d2) = (k0.slope, k1.slope);
                (x * (delta * (3.0 * h - 2.0 * x) * x + h * (-h + x) * (-(d1 * h) + x * (d1 + d2))))
                    / (h * h * h)
                    + k0.value
            }
        }
    }
}

impl Vertex {
    const fn sentinel(position: f64, value: f64) -> Self {
        Self {
            position,
            value,
            slope: 0.0,
            interpolation: Interpolation::None,
        }
    }
}

fn clamp_slope(slope: f64, secant: f64) -> f64 {
    if secant == 0.0 {
        0.0
    } else {
        (slope / secant).clamp(0.0, 3.0) * secant
    }
}
