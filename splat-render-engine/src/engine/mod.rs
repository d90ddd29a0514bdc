//! Splat scene engine: camera, spatial index, depth sorting and the frame
//! loop tying them to a render target.

/// Camera state and orbit controller.
pub mod camera;
/// Scene loading from persisted buffers and raw point clouds.
pub mod loading;
/// Frame orchestration: culling, sort scheduling, permutation hand-off.
pub mod orchestrator;
/// Render target seam and attribute texture layouts.
pub mod render;
/// Counting sort kernel and its worker thread.
pub mod sort;
/// Octree over splat positions.
pub mod spatial;
