/// Materialized view of one logical splat
use crate::covariance::compute_covariance;
use glam::{Quat, Vec3};
use splat_constants::format::{COVARIANCE_SIZE_FLOATS, SENTINEL_COLOR};

/// A single splat decoded from (or about to be encoded into) a buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatRecord {
    pub position: Vec3,
    /// Linear (already exponentiated) scale per axis.
    pub scale: Vec3,
    /// Unit quaternion.
    pub rotation: Quat,
    /// RGBA, alpha not premultiplied.
    pub color: [u8; 4],
}

impl SplatRecord {
    pub fn new(position: Vec3, scale: Vec3, rotation: Quat, color: [u8; 4]) -> Self {
        Self {
            position,
            scale,
            rotation: normalize_or_identity(rotation),
            color,
        }
    }

    /// Padding splat used to fill buckets up to capacity.
    /// Zero scale and zero alpha make it invisible and cheap to cull.
    pub fn sentinel(position: Vec3) -> Self {
        Self {
            position,
            scale: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            color: SENTINEL_COLOR,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.color[3] == 0 && self.scale == Vec3::ZERO
    }

    /// False when any geometric component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.scale.is_finite() && self.rotation.is_finite()
    }

    pub fn covariance(&self) -> [f32; COVARIANCE_SIZE_FLOATS] {
        compute_covariance(self.scale, self.rotation)
    }
}

/// Normalize a quaternion, mapping degenerate input to identity.
pub fn normalize_or_identity(rotation: Quat) -> Quat {
    let length_squared = rotation.length_squared();
    if length_squared.is_finite() && length_squared > f32::EPSILON {
        rotation / length_squared.sqrt()
    } else {
        Quat::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_rotation() {
        let record = SplatRecord::new(
            Vec3::ZERO,
            Vec3::ONE,
            Quat::from_xyzw(0.0, 0.0, 0.0, 2.0),
            [0, 0, 0, 255],
        );
        assert_eq!(record.rotation, Quat::IDENTITY);
    }

    #[test]
    fn zero_quaternion_becomes_identity() {
        assert_eq!(normalize_or_identity(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)), Quat::IDENTITY);
    }
}
