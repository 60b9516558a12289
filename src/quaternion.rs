use std::f64;
use std::ops;

use crate::constants::LINEAR_THRESHOLD;
use crate::geometry::Vec3;

fn float_equals(x: f64, y: f64) -> bool {
    (x - y).abs() < f64::EPSILON
}

/// Unit quaternion used by `Selection::rotate` and the Kabsch fitting
/// pipeline to carry rigid-body orientation. Adapted from the docking
/// engine's glowworm-orientation quaternion: same algebra, retargeted to
/// rotate atom coordinates of a `Selection` instead of a ligand pose.
#[derive(Debug, Copy, Clone)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Quaternion {
        Quaternion { w, x, y, z }
    }

    /// Build the quaternion that rotates by `angle` radians around `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Quaternion {
        let n = crate::geometry::normalized(axis);
        let half = angle / 2.0;
        let s = half.sin();
        Quaternion::new(half.cos(), n[0] * s, n[1] * s, n[2] * s)
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn dot(&self, other: Quaternion) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm2(&self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn norm(&self) -> f64 {
        self.norm2().sqrt()
    }

    pub fn normalize(&mut self) {
        let norm = self.norm();
        self.w /= norm;
        self.x /= norm;
        self.y /= norm;
        self.z /= norm;
    }

    pub fn inverse(&self) -> Quaternion {
        self.conjugate() / self.norm2()
    }

    pub fn distance(&self, other: Quaternion) -> f64 {
        let dot = self.dot(other);
        1.0 - dot * dot
    }

    /// Rotate a 3D point by this quaternion (`self * p * self^-1`).
    pub fn rotate(&self, point: Vec3) -> Vec3 {
        let v = Quaternion::new(0.0, point[0], point[1], point[2]);
        let r = *self * v * self.inverse();
        [r.x, r.y, r.z]
    }

    /// 3x3 rotation matrix equivalent to this (assumed unit) quaternion.
    pub fn to_matrix(&self) -> crate::geometry::Mat3 {
        let (w, x, y, z) = (self.w, self.x, self.y, self.z);
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - z * w),
                2.0 * (x * z + y * w),
            ],
            [
                2.0 * (x * y + z * w),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - x * w),
            ],
            [
                2.0 * (x * z - y * w),
                2.0 * (y * z + x * w),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }

    pub fn lerp(&self, other: Quaternion, t: f64) -> Quaternion {
        *self * (1.0 - t) + other * t
    }

    pub fn slerp(&self, other: &Quaternion, t: f64) -> Quaternion {
        let mut q1 = *self;
        let mut q2 = *other;
        q1.normalize();
        q2.normalize();
        let mut q_dot = q1.dot(q2);

        // Avoid the long path around the hypersphere.
        if q_dot < 0.0 {
            q1 = -q1;
            q_dot *= -1.0;
        }

        if q_dot > LINEAR_THRESHOLD {
            let mut result = q1 + (q2 - q1) * t;
            result.normalize();
            result
        } else {
            q_dot = (q_dot).clamp(-1.0, 1.0);
            let omega = q_dot.acos();
            let so = omega.sin();
            q1 * (((1.0 - t) * omega).sin() / so) + q2 * ((t * omega).sin() / so)
        }
    }

}

impl Default for Quaternion {
    fn default() -> Quaternion {
        Quaternion {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl ops::Sub for Quaternion {
    type Output = Self;
    fn sub(self, other: Quaternion) -> Self::Output {
        Quaternion::new(self.w - other.w, self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl ops::Add for Quaternion {
    type Output = Self;
    fn add(self, other: Quaternion) -> Self::Output {
        Quaternion::new(self.w + other.w, self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        float_equals(self.w, other.w)
            && float_equals(self.x, other.x)
            && float_equals(self.y, other.y)
            && float_equals(self.z, other.z)
    }
}
impl Eq for Quaternion {}

impl ops::Neg for Quaternion {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Quaternion::new(-self.w, -self.x, -self.y, -self.z)
    }
}

impl ops::Mul<f64> for Quaternion {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self::Output {
        Quaternion::new(scalar * self.w, scalar * self.x, scalar * self.y, scalar * self.z)
    }
}

impl ops::Mul for Quaternion {
    type Output = Self;
    fn mul(self, other: Quaternion) -> Self::Output {
        Quaternion::new(
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        )
    }
}

impl ops::Div<f64> for Quaternion {
    type Output = Self;
    fn div(self, scalar: f64) -> Self::Output {
        Quaternion::new(self.w / scalar, self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quaternion_default() {
        let q1: Quaternion = Default::default();
        assert_eq!(q1.w, 1.0);
        assert_eq!(q1.x, 0.0);
    }

    #[test]
    fn quaternion_mul() {
        let q1 = Quaternion::new(1.0, 0.0, 0.0, 2.0);
        let q2 = Quaternion::new(3.0, -1.0, 4.0, 3.0);
        let expected = Quaternion::new(-3.0, -9.0, 2.0, 9.0);
        assert!(expected == q1 * q2);
    }

    #[test]
    fn quaternion_rotation_z_axis() {
        let q = Quaternion::new(0.707106781, 0.0, 0.707106781, 0.0);
        let v: Vec3 = [1.0, 0.0, 0.0];
        let v2 = q.rotate(v);
        assert!((v2[0]).abs() < 1e-6);
        assert!((v2[1]).abs() < 1e-6);
        assert!((v2[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn from_axis_angle_identity_at_zero() {
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], 0.0);
        assert!(q == Quaternion::default());
    }

    #[test]
    fn from_axis_angle_rotates_90_degrees() {
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2);
        let v = q.rotate([1.0, 0.0, 0.0]);
        assert!((v[0]).abs() < 1e-9);
        assert!((v[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn slerp_endpoints() {
        let q1 = Quaternion::new(1.0, 0.0, 0.0, 0.0);
        let q2 = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        assert!(q1.slerp(&q2, 0.0) == q1);
    }
}
