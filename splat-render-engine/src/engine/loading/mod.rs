//! Scene loading for the splat viewer.
//!
//! Reads persisted splat buffers directly and runs raw point clouds through
//! ingestion, reporting byte and row progress along the way.

/// Splat scene loading from `.splat`, `.ply` and LAS/LAZ files.
pub mod scene_loader;

pub use scene_loader::{LoadedScene, load_scene, read_with_progress};
