/// Runtime configuration for the splat viewer
use crate::engine::sort::{DepthMetric, SortKernel, TailPlacement};
use crate::error::ConfigError;
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use splat_constants::render_settings::*;
use splat_constants::sorting::DEPTH_MAP_RANGE;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub splat_tree: SplatTreeConfig,
    pub culling: CullingConfig,
    pub scheduling: SchedulingConfig,
    pub sort: SortConfig,
    pub scene: SceneTransform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatTreeConfig {
    pub max_depth: u32,
    pub max_indexes_per_node: usize,
    /// Splats with alpha at or below this byte value are not indexed.
    pub alpha_threshold: u8,
}

impl Default for SplatTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: SPLAT_TREE_MAX_DEPTH,
            max_indexes_per_node: SPLAT_TREE_MAX_INDEXES_PER_NODE,
            alpha_threshold: SPLAT_ALPHA_REMOVAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    pub max_sort_distance: f32,
    pub max_render_distance: f32,
    pub fov_margin: f32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            max_sort_distance: MAXIMUM_DISTANCE_TO_SORT,
            max_render_distance: MAXIMUM_DISTANCE_TO_RENDER,
            fov_margin: FOV_CULL_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub rotation_dot_threshold: f32,
    pub translation_threshold: f32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            rotation_dot_threshold: SORT_ROTATION_DOT_THRESHOLD,
            translation_threshold: SORT_TRANSLATION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub kernel: SortKernel,
    pub depth_metric: DepthMetric,
    pub tail_placement: TailPlacement,
    pub depth_map_range: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            kernel: SortKernel::default(),
            depth_metric: DepthMetric::default(),
            tail_placement: TailPlacement::default(),
            depth_map_range: DEPTH_MAP_RANGE,
        }
    }
}

/// Placement of the splat scene in world space.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneTransform {
    pub position: Vec3,
    /// Euler angles in degrees, applied in YXZ order.
    pub rotation_degrees: Vec3,
    pub scale: Vec3,
}

impl Default for SceneTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl SceneTransform {
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            self.rotation_degrees.y.to_radians(),
            self.rotation_degrees.x.to_radians(),
            self.rotation_degrees.z.to_radians(),
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl ViewerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: ViewerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.splat_tree.max_indexes_per_node == 0 {
            return Err(ConfigError::Invalid(
                "splat_tree.max_indexes_per_node must be positive".into(),
            ));
        }
        if self.sort.depth_map_range < 2 {
            return Err(ConfigError::Invalid(
                "sort.depth_map_range must be at least 2".into(),
            ));
        }
        if self.culling.max_sort_distance > self.culling.max_render_distance {
            tracing::warn!(
                "max_sort_distance {} exceeds max_render_distance {}; sorting stops at the render distance",
                self.culling.max_sort_distance,
                self.culling.max_render_distance
            );
        }
        if self.scene.scale.min_element() <= 0.0 {
            return Err(ConfigError::Invalid("scene.scale must be positive".into()));
        }
        Ok(())
    }
}
