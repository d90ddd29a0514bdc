use glam::{Mat4, Quat, Vec3};
use splat_constants::render_settings::DEFAULT_CAMERA_FOV_DEGREES;

/// Camera view and projection parameters.
/// Right handed, looking down `-Z` in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub orientation: Quat,
    pub fov_y_degrees: f32,
    /// Width over height of the render surface.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            fov_y_degrees: DEFAULT_CAMERA_FOV_DEGREES,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraState {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
            ..Default::default()
        }
    }

    /// Camera placed at `position` facing `target`, with `+Y` up.
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        let view = Mat4::look_at_rh(position, target, Vec3::Y);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self::new(position, rotation)
    }

    /// World space viewing direction.
    pub fn forward(&self) -> Vec3 {
        (self.orientation * Vec3::NEG_Z).normalize()
    }

    /// World to view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Half angles of the horizontal and vertical field of view, in radians.
    pub fn half_fov(&self) -> (f32, f32) {
        let half_y = self.fov_y_degrees.to_radians() * 0.5;
        let half_x = (half_y.tan() * self.aspect).atan();
        (half_x, half_y)
    }
}
