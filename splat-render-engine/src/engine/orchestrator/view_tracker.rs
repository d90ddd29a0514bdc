use crate::config::SchedulingConfig;
use crate::engine::camera::CameraState;
use glam::Vec3;

/// Camera pose of the last dispatched sort, used to decide when the current
/// permutation has gone stale.
#[derive(Debug, Clone)]
pub struct ViewTracker {
    last_direction: Vec3,
    last_position: Vec3,
    rotation_dot_threshold: f32,
    translation_threshold: f32,
}

impl ViewTracker {
    pub fn new(scheduling: &SchedulingConfig) -> Self {
        Self {
            last_direction: Vec3::NEG_Z,
            last_position: Vec3::ZERO,
            rotation_dot_threshold: scheduling.rotation_dot_threshold,
            translation_threshold: scheduling.translation_threshold,
        }
    }

    /// True once the camera has turned or moved past the thresholds.
    pub fn needs_sort(&self, camera: &CameraState) -> bool {
        let rotated = camera.forward().dot(self.last_direction) <= self.rotation_dot_threshold;
        let moved = camera.position.distance(self.last_position) >= self.translation_threshold;
        rotated || moved
    }

    /// Record the pose a sort was dispatched for.
    pub fn accept(&mut self, camera: &CameraState) {
        self.last_direction = camera.forward();
        self.last_position = camera.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn tracker_at_origin() -> ViewTracker {
        let mut tracker = ViewTracker::new(&SchedulingConfig::default());
        tracker.accept(&CameraState::default());
        tracker
    }

    #[test]
    fn small_moves_keep_the_last_sort() {
        let tracker = tracker_at_origin();
        let camera = CameraState::new(Vec3::new(0.5, 0.0, 0.0), Quat::IDENTITY);
        assert!(!tracker.needs_sort(&camera));

        let camera = CameraState::new(Vec3::new(1.5, 0.0, 0.0), Quat::IDENTITY);
        assert!(tracker.needs_sort(&camera));
    }

    #[test]
    fn turning_past_the_threshold_triggers_a_sort() {
        let tracker = tracker_at_origin();
        let slight = CameraState::new(Vec3::ZERO, Quat::from_rotation_y(0.1));
        assert!(!tracker.needs_sort(&slight));

        // cos(0.4) is about 0.92.
        let turned = CameraState::new(Vec3::ZERO, Quat::from_rotation_y(0.4));
        assert!(tracker.needs_sort(&turned));
    }

    #[test]
    fn accept_moves_the_reference_pose() {
        let mut tracker = tracker_at_origin();
        let moved = CameraState::new(Vec3::new(3.0, 0.0, 0.0), Quat::IDENTITY);
        assert!(tracker.needs_sort(&moved));
        tracker.accept(&moved);
        assert!(!tracker.needs_sort(&moved));
    }
}
