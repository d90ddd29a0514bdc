use crate::config::CullingConfig;
use crate::engine::camera::CameraState;
use crate::engine::spatial::{SplatTree, SplatTreeNode};
use glam::{Mat4, Vec3};

/// Sizes of the candidate buffer produced by one culling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateCounts {
    /// `K`: leading indexes that get an exact depth sort.
    pub sort_count: usize,
    /// `M`: every index written to the buffer.
    pub render_count: usize,
    pub visible_leaves: usize,
    pub total_leaves: usize,
}

/// Fill `out` with the splat indexes of visible leaves.
///
/// Leaves within the sort distance come first, followed by the remaining
/// visible leaves farthest first. Both groups are ordered by descending
/// distance to the camera. `gather_all` skips culling entirely.
pub fn gather_candidates(
    tree: &SplatTree,
    camera: &CameraState,
    model: &Mat4,
    culling: &CullingConfig,
    gather_all: bool,
    out: &mut Vec<u32>,
) -> CandidateCounts {
    let (half_fov_x, half_fov_y) = camera.half_fov();
    let cos_limit_x = half_fov_x.cos() - culling.fov_margin;
    let cos_limit_y = half_fov_y.cos() - culling.fov_margin;
    let model_view = camera.view_matrix() * *model;

    let mut visible: Vec<(f32, &SplatTreeNode)> = Vec::new();
    let mut total_leaves = 0;
    tree.visit_leaves(|leaf| {
        if leaf.indexes.is_empty() {
            return;
        }
        total_leaves += 1;

        let in_view = model_view.transform_point3(leaf.center);
        let distance = in_view.length();
        if !gather_all {
            let (dot_x, dot_y) = forward_dots(in_view);
            let out_of_fov_x = dot_x < cos_limit_x;
            let out_of_fov_y = dot_y < cos_limit_y;
            let too_far = distance > culling.max_render_distance;
            // Leaves the camera sits inside are always kept.
            if (out_of_fov_x || out_of_fov_y || too_far) && distance > leaf.size() {
                return;
            }
        }
        visible.push((distance, leaf));
    });

    visible.sort_by(|a, b| b.0.total_cmp(&a.0));

    out.clear();
    let mut sort_count = 0;
    for (distance, leaf) in &visible {
        if *distance <= culling.max_sort_distance {
            out.extend_from_slice(&leaf.indexes);
            sort_count += leaf.indexes.len();
        }
    }
    for (distance, leaf) in &visible {
        if *distance > culling.max_sort_distance {
            out.extend_from_slice(&leaf.indexes);
        }
    }

    CandidateCounts {
        sort_count,
        render_count: out.len(),
        visible_leaves: visible.len(),
        total_leaves,
    }
}

/// Cosines between view forward (`-Z`) and the direction to `point`,
/// measured in the XZ and YZ planes.
fn forward_dots(point: Vec3) -> (f32, f32) {
    let direction = point.normalize_or_zero();
    let xz = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
    let yz = Vec3::new(0.0, direction.y, direction.z).normalize_or_zero();
    (Vec3::NEG_Z.dot(xz), Vec3::NEG_Z.dot(yz))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One splat at each corner of `x, y in [-1, 1]`, `z in {-60, -20}`.
    /// Corner `i` lands alone in octant `i`; near leaves are 4..8 centred at
    /// `z = -30`, far leaves 0..4 at `z = -50`, each about 20 units across.
    fn corner_tree() -> SplatTree {
        let positions: Vec<Vec3> = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 != 0 { 1.0 } else { -1.0 },
                    if i & 2 != 0 { 1.0 } else { -1.0 },
                    if i & 4 != 0 { -20.0 } else { -60.0 },
                )
            })
            .collect();
        let mut tree = SplatTree::new(10, 2);
        tree.build_from_positions(&positions, (0..8).collect());
        tree
    }

    fn culling(max_sort: f32, max_render: f32) -> CullingConfig {
        CullingConfig {
            max_sort_distance: max_sort,
            max_render_distance: max_render,
            fov_margin: 0.5,
        }
    }

    fn gather(camera: &CameraState, model: &Mat4, config: &CullingConfig, all: bool) -> (CandidateCounts, Vec<u32>) {
        let mut out = Vec::new();
        let counts = gather_candidates(&corner_tree(), camera, model, config, all, &mut out);
        (counts, out)
    }

    #[test]
    fn near_leaves_form_the_sorted_prefix() {
        let (counts, out) = gather(&CameraState::default(), &Mat4::IDENTITY, &culling(40.0, 125.0), false);
        assert_eq!(counts.total_leaves, 8);
        assert_eq!(counts.visible_leaves, 8);
        assert_eq!(counts.sort_count, 4);
        assert_eq!(counts.render_count, 8);
        assert_eq!(out, vec![4, 5, 6, 7, 0, 1, 2, 3]);
    }

    #[test]
    fn leaves_past_render_distance_are_dropped() {
        let (counts, out) = gather(&CameraState::default(), &Mat4::IDENTITY, &culling(40.0, 45.0), false);
        assert_eq!(counts.render_count, 4);
        assert_eq!(out, vec![4, 5, 6, 7]);
    }

    #[test]
    fn leaves_behind_the_camera_are_culled_unless_gathering_all() {
        let facing_away = CameraState::look_at(Vec3::ZERO, Vec3::Z);
        let (counts, out) = gather(&facing_away, &Mat4::IDENTITY, &culling(125.0, 125.0), false);
        assert_eq!(counts.render_count, 0);
        assert!(out.is_empty());

        let (counts, _) = gather(&facing_away, &Mat4::IDENTITY, &culling(125.0, 125.0), true);
        assert_eq!(counts.render_count, 8);
        assert_eq!(counts.sort_count, 8);
    }

    #[test]
    fn leaves_around_the_camera_are_kept() {
        // Near leaves sit behind this camera but closer than their own size.
        let camera = CameraState::look_at(Vec3::new(0.0, 0.0, -25.0), Vec3::ZERO);
        let (counts, out) = gather(&camera, &Mat4::IDENTITY, &culling(125.0, 125.0), false);
        assert_eq!(counts.render_count, 4);
        assert_eq!(out, vec![4, 5, 6, 7]);
    }

    #[test]
    fn model_transform_applies_before_culling() {
        let flip = Mat4::from_rotation_y(std::f32::consts::PI);
        let (counts, _) = gather(&CameraState::default(), &flip, &culling(125.0, 125.0), false);
        assert_eq!(counts.render_count, 0);
    }
}
