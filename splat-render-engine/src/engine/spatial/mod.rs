//! Spatial partitioning of splat scenes.
//!
//! The octree groups splat indexes into leaves that are culled and ordered
//! as units when building sort candidates.

/// Octree over splat positions with per-leaf index lists.
pub mod splat_tree;

pub use splat_tree::{SplatTree, SplatTreeNode};
