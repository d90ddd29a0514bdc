//! Renderer seam for splat scenes.
//!
//! The engine produces attribute textures once and a fresh draw order after
//! every completed sort; a render target consumes both.

/// GPU-ready attribute texture data built from a splat buffer.
pub mod attribute_data;
/// Render target trait and a headless implementation.
pub mod render_target;

pub use attribute_data::{CenterColorTexel, SplatAttributeData};
pub use render_target::{HeadlessTarget, SplatRenderTarget};
