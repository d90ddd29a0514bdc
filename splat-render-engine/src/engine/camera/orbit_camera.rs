use super::camera_state::CameraState;
use glam::{EulerRot, Quat, Vec3};
use splat_buffer::SplatBounds;

/// Orbit controller around a focus point.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            focus_point: Vec3::ZERO,
            distance: 10.0,
            pitch: -0.6,
            yaw: 0.0,
        }
    }
}

impl OrbitCamera {
    pub fn new(focus_point: Vec3, distance: f32) -> Self {
        Self {
            focus_point,
            distance,
            ..Default::default()
        }
    }

    /// Frame the whole scene from outside its bounds.
    pub fn with_bounds(bounds: &SplatBounds) -> Self {
        let size = bounds.dimensions();
        Self::new(bounds.center(), (size.length() * 0.8).max(1.0))
    }

    /// Rotate by yaw/pitch deltas in radians; pitch stays short of the poles.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-1.55, 1.55);
    }

    /// Move toward or away from the focus point.
    pub fn dolly(&mut self, amount: f32) {
        self.distance = (self.distance - amount).max(0.1);
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Camera state looking at the focus point from the current orbit.
    pub fn camera_state(&self, template: &CameraState) -> CameraState {
        let rotation = self.rotation();
        let back = (rotation * Vec3::Z).normalize();
        CameraState {
            position: self.focus_point + back * self.distance,
            orientation: rotation,
            ..*template
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_keeps_the_focus_in_front() {
        let mut orbit = OrbitCamera::new(Vec3::new(3.0, 1.0, -2.0), 20.0);
        for _ in 0..12 {
            orbit.orbit(0.4, 0.2);
            let camera = orbit.camera_state(&CameraState::default());
            let to_focus = (orbit.focus_point - camera.position).normalize();
            assert!(camera.forward().dot(to_focus) > 0.9999);
            assert!((camera.position.distance(orbit.focus_point) - 20.0).abs() < 1e-3);
        }
        assert!(orbit.pitch <= 1.55);
    }
}
