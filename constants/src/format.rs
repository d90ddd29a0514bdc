/// Persisted splat buffer layout and ingestion defaults.

/// Fixed size of the persisted header block in bytes.
pub const HEADER_SIZE_BYTES: usize = 1024;

/// Header version written by this pipeline.
pub const FORMAT_VERSION_MAJOR: u8 = 0;
pub const FORMAT_VERSION_MINOR: u8 = 1;

/// Number of splats sharing one quantization origin.
pub const BUCKET_SIZE: usize = 256;

/// Edge length of a cubic bucket cell in world units.
pub const BUCKET_BLOCK_SIZE: f32 = 5.0;

/// Bucket center table entry (3 x f32).
pub const BYTES_PER_BUCKET: usize = 12;

/// Quantization half-range per compression level.
pub const FULL_SCALE_RANGE: u32 = 1;
pub const QUANTIZED_SCALE_RANGE: u32 = 32767;

/// Upper triangle of the 3x3 covariance matrix.
pub const COVARIANCE_SIZE_FLOATS: usize = 6;

/// Zeroth order spherical harmonic basis constant.
pub const SH_C0: f32 = 0.282_094_8;

/// Substituted when a source carries no scale fields.
pub const DEFAULT_SCALE: f32 = 0.01;

/// Substituted when a source carries no color fields (opaque red).
pub const DEFAULT_COLOR: [u8; 4] = [255, 0, 0, 255];

/// Colour written into bucket padding slots; alpha 0 keeps them invisible.
pub const SENTINEL_COLOR: [u8; 4] = [255, 0, 0, 0];

/// Rows with alpha (0-255 scale) at or below this are dropped on ingestion.
pub const DEFAULT_MINIMUM_ALPHA: f32 = 1.0;

/// Isotropic splat size used for point clouds without scale data.
pub const DEFAULT_POINT_SIZE: f32 = 0.02;

/// Largest header a PLY document may carry before it is rejected.
pub const MAX_PLY_HEADER_BYTES: usize = 65_536;
