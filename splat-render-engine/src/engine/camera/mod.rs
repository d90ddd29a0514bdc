//! Camera model for splat scene navigation.
//!
//! Provides the view state consumed by culling and depth sorting, plus an
//! orbit controller that drives it around a focus point.

/// View provider state: position, orientation and projection parameters.
pub mod camera_state;
/// Yaw/pitch orbit controller producing camera states.
pub mod orbit_camera;

pub use camera_state::CameraState;
pub use orbit_camera::OrbitCamera;
