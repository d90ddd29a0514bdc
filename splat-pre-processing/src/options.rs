/// Runtime knobs for turning a source cloud into a splat buffer
use serde::{Deserialize, Serialize};
use splat_buffer::CompressionLevel;
use splat_constants::format::{
    BUCKET_BLOCK_SIZE, BUCKET_SIZE, DEFAULT_MINIMUM_ALPHA, DEFAULT_POINT_SIZE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub compression_level: CompressionLevel,
    /// Rows whose alpha (0-255 scale) is not strictly above this are dropped.
    pub minimum_alpha: f32,
    pub bucket_size: usize,
    /// Edge length of a bucket cell in world units.
    pub block_size: f32,
    /// Isotropic scale given to point cloud sources without scale data.
    pub point_size: f32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            compression_level: CompressionLevel::Full,
            minimum_alpha: DEFAULT_MINIMUM_ALPHA,
            bucket_size: BUCKET_SIZE,
            block_size: BUCKET_BLOCK_SIZE,
            point_size: DEFAULT_POINT_SIZE,
        }
    }
}
