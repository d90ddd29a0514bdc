/// 3D covariance of an anisotropic Gaussian from its scale and rotation
use glam::{Mat3, Quat, Vec3};
use splat_constants::format::COVARIANCE_SIZE_FLOATS;

/// Upper triangle of `R * S * S^T * R^T` in the order
/// `[xx, xy, xz, yy, yz, zz]`.
pub fn compute_covariance(scale: Vec3, rotation: Quat) -> [f32; COVARIANCE_SIZE_FLOATS] {
    let m = Mat3::from_quat(rotation) * Mat3::from_diagonal(scale);
    let sigma = m * m.transpose();

    [
        sigma.x_axis.x,
        sigma.y_axis.x,
        sigma.z_axis.x,
        sigma.y_axis.y,
        sigma.z_axis.y,
        sigma.z_axis.z,
    ]
}
