/// Culling and sort scheduling defaults for the frame orchestrator.

/// Leaves closer than this are exactly depth sorted.
pub const MAXIMUM_DISTANCE_TO_SORT: f32 = 125.0;

/// Leaves farther than this are dropped from the frame.
pub const MAXIMUM_DISTANCE_TO_RENDER: f32 = 125.0;

/// Slack subtracted from the half field of view cosine when culling leaves.
pub const FOV_CULL_MARGIN: f32 = 0.5;

/// A re-sort is requested once the view direction dot product falls to this.
pub const SORT_ROTATION_DOT_THRESHOLD: f32 = 0.95;

/// A re-sort is requested once the camera has moved this far.
pub const SORT_TRANSLATION_THRESHOLD: f32 = 1.0;

/// Octree subdivision limits.
pub const SPLAT_TREE_MAX_DEPTH: u32 = 10;
pub const SPLAT_TREE_MAX_INDEXES_PER_NODE: usize = 500;

/// Splats whose alpha byte is at or below this are left out of the octree.
pub const SPLAT_ALPHA_REMOVAL_THRESHOLD: u8 = 1;

/// Vertical field of view of the default camera, in degrees.
pub const DEFAULT_CAMERA_FOV_DEGREES: f32 = 50.0;
