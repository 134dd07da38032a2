use std::ops::Mul;

use super::core::{Tolerance, Vec3};

/// Quaternion `w + xi + yj + zk`, used for rotation-minimizing frame transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Pure quaternion with zero scalar part.
    #[must_use]
    pub const fn pure(v: Vec3) -> Self {
        Self::new(0.0, v.x, v.y, v.z)
    }

    #[must_use]
    pub const fn vector(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[must_use]
    pub const fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    #[must_use]
    pub fn length(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > Tolerance::ZERO_LENGTH.eps {
            Some(Self::new(self.w / len, self.x / len, self.y / len, self.z / len))
        } else {
            None
        }
    }

    /// Hamilton product; the result applies `rhs` first, then `self`.
    #[must_use]
    pub fn hamilton(self, rhs: Self) -> Self {
        let a = self.vector();
        let b = rhs.vector();
        let w = self.w * rhs.w - a.dot(b);
        let v = b * self.w + a * rhs.w + a.cross(b);
        Self::new(w, v.x, v.y, v.z)
    }

    /// Product of two pure quaternions: `(-a·b, a×b)`.
    #[must_use]
    pub fn pure_product(a: Vec3, b: Vec3) -> Self {
        let v = a.cross(b);
        Self::new(-a.dot(b), v.x, v.y, v.z)
    }

    /// Rotate `v` by this (unit) quaternion: vector part of `q v q*`.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        self.hamilton(Self::pure(v)).hamilton(self.conjugate()).vector()
    }

    /// Shortest-arc rotation taking unit vector `from` onto unit vector `to`.
    #[must_use]
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let d = from.dot(to);
        if d < -1.0 + Tolerance::LOOSE.eps {
            let axis = from.any_perpendicular();
            return Self::pure(axis);
        }
        let v = from.cross(to);
        Self::new(1.0 + d, v.x, v.y, v.z)
            .normalized()
            .unwrap_or(Self::IDENTITY)
    }

    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let Some(axis) = axis.normalized() else {
            return Self::IDENTITY;
        };
        let (s, c) = (0.5 * angle).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quat {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.hamilton(rhs)
    }
}
