/// Depth sort engine parameters.

/// Number of counting sort buckets used to quantize depth.
pub const DEPTH_MAP_RANGE: usize = 1 << 16;

/// Positions and view matrices are scaled by this before integer conversion.
pub const FIXED_POINT_SCALE: f32 = 1000.0;

/// Elements handled per rayon task in the parallel kernel.
pub const PARALLEL_SORT_CHUNK: usize = 65_536;
