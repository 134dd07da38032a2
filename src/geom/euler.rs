use serde::{Deserialize, Serialize};

use super::core::{Transform, Vec3};

/// Euler rotation order. `Xyz` rotates about X first, then Y, then Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateOrder {
    #[default]
    Xyz,
    Yzx,
    Zxy,
    Xzy,
    Yxz,
    Zyx,
}

impl RotateOrder {
    pub const ALL: [Self; 6] = [
        Self::Xyz,
        Self::Yzx,
        Self::Zxy,
        Self::Xzy,
        Self::Yxz,
        Self::Zyx,
    ];

    /// Enum index as exposed on the node (`xyz = 0` .. `zyx = 5`).
    #[must_use]
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    #[must_use]
    pub const fn index(self) -> i32 {
        match self {
            Self::Xyz => 0,
            Self::Yzx => 1,
            Self::Zxy => 2,
            Self::Xzy => 3,
            Self::Yxz => 4,
            Self::Zyx => 5,
        }
    }

    /// Axis indices in application order, plus the permutation parity sign.
    const fn axes(self) -> (usize, usize, usize, f64) {
        match self {
            Self::Xyz => (0, 1, 2, 1.0),
            Self::Yzx => (1, 2, 0, 1.0),
            Self::Zxy => (2, 0, 1, 1.0),
            Self::Xzy => (0, 2, 1, -1.0),
            Self::Yxz => (1, 0, 2, -1.0),
            Self::Zyx => (2, 1, 0, -1.0),
        }
    }
}

/// Extract Euler angles (radians, per axis) from the rotation part of `frame`.
///
/// Axis columns are normalized first so scaled frames give the same angles.
#[must_use]
pub fn euler_from_transform(frame: &Transform, order: RotateOrder) -> Vec3 {
    let cols = [
        frame.axis(0).normalized_or(Vec3::X),
        frame.axis(1).normalized_or(Vec3::Y),
        frame.axis(2).normalized_or(Vec3::Z),
    ];
    let r = |row: usize, col: usize| -> f64 { cols[col].to_array()[row] };

    let (i, j, k, sign) = order.axes();
    let sin_b = (-sign * r(k, i)).clamp(-1.0, 1.0);
    let b = sin_b.asin();

    let (a, c) = if sin_b.abs() < 1.0 - 1e-12 {
        (
            (sign * r(k, j)).atan2(r(k, k)),
            (sign * r(j, i)).atan2(r(i, i)),
        )
    } else {
        (0.0, (-sign * r(i, j)).atan2(r(j, j)))
    };

    let mut angles = [0.0; 3];
    angles[i] = a;
    angles[j] = b;
    angles[k] = c;
    Vec3::from_array(angles)
}
