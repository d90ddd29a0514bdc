/// Compact columnar storage for Gaussian splats with optional quantization.
pub mod bounds;
pub mod compression;
pub mod covariance;
pub mod error;
pub mod header;
pub mod record;
pub mod splat_buffer;

pub use bounds::SplatBounds;
pub use compression::CompressionLevel;
pub use error::SplatBufferError;
pub use header::SplatBufferHeader;
pub use record::SplatRecord;
pub use splat_buffer::SplatBuffer;
