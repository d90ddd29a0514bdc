/// Headless Gaussian splat viewer engine: octree culling and background
/// depth sorting driven by camera motion.
pub mod config;
pub mod engine;
pub mod error;

pub use config::ViewerConfig;
pub use engine::camera::{CameraState, OrbitCamera};
pub use engine::orchestrator::{DispatchOutcome, FrameOrchestrator, SortStatistics};
pub use engine::render::{HeadlessTarget, SplatAttributeData, SplatRenderTarget};
pub use error::{ConfigError, SceneLoadError, SortEngineError};
