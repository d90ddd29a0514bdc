/// Grid bucketing of splats into fixed capacity cubic cells
use crate::error::IngestError;
use glam::{DVec3, IVec3, Vec3};
use splat_buffer::SplatBounds;
use std::collections::HashMap;

/// Row index reserved for the sentinel splat; used as bucket padding.
pub const SENTINEL_ROW: usize = 0;

/// A full capacity group of rows sharing one quantization origin.
#[derive(Debug, Clone, PartialEq)]
pub struct SplatBucket {
    pub center: Vec3,
    /// Row indices, padded with `SENTINEL_ROW` up to the bucket size.
    pub members: Vec<usize>,
}

impl SplatBucket {
    pub fn real_members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied().filter(|&row| row != SENTINEL_ROW)
    }
}

/// Spatial bucket generator over a uniform grid of cubic cells
pub struct SpatialBucketGenerator {
    bounds: SplatBounds,
    block_size: f32,
    bucket_size: usize,
    grid_dims: IVec3,
}

impl SpatialBucketGenerator {
    /// Grid over `bounds`. Fails when the options are unusable or when the
    /// grid volume does not fit the 64-bit cell key.
    pub fn new(bounds: SplatBounds, block_size: f32, bucket_size: usize) -> Result<Self, IngestError> {
        if bucket_size == 0 {
            return Err(IngestError::InvalidOptions("bucket size must be non-zero".to_string()));
        }
        if !(block_size.is_finite() && block_size > 0.0) {
            return Err(IngestError::InvalidOptions(format!(
                "block size must be positive, got {}",
                block_size
            )));
        }

        let cells = (bounds.dimensions().as_dvec3() / f64::from(block_size)).floor() + DVec3::ONE;
        let limit = f64::from(i32::MAX);
        if !cells.is_finite() || cells.max_element() > limit {
            return Err(IngestError::BucketGrid(format!(
                "extent {:?} at block size {}",
                bounds.dimensions(),
                block_size
            )));
        }
        let grid_dims = cells.as_ivec3().max(IVec3::ONE);
        let volume = (grid_dims.x as u64)
            .checked_mul(grid_dims.y as u64)
            .and_then(|area| area.checked_mul(grid_dims.z as u64));
        if volume.is_none() {
            return Err(IngestError::BucketGrid(format!(
                "{} x {} x {} cells",
                grid_dims.x, grid_dims.y, grid_dims.z
            )));
        }

        Ok(Self {
            bounds,
            block_size,
            bucket_size,
            grid_dims,
        })
    }

    /// Integer grid coordinates of the cell containing a point.
    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        let cell = ((position - self.bounds.min) / self.block_size)
            .floor()
            .as_ivec3();
        cell.clamp(IVec3::ZERO, self.grid_dims - IVec3::ONE)
    }

    pub fn cell_center(&self, cell: IVec3) -> Vec3 {
        self.bounds.min + (cell.as_vec3() + Vec3::splat(0.5)) * self.block_size
    }

    /// Single key combining the three cell coordinates. Cells are clamped
    /// to the grid, whose volume `new` checked against `u64`.
    fn cell_key(&self, cell: IVec3) -> u64 {
        let (ny, nz) = (self.grid_dims.y as u64, self.grid_dims.z as u64);
        cell.x as u64 * ny * nz + cell.y as u64 * nz + cell.z as u64
    }

    /// Bin every row except the sentinel at index 0. Buckets are emitted in
    /// the order they fill; leftover partial buckets follow in the order
    /// their cell was first touched, padded with the sentinel row.
    pub fn compute_buckets(&self, positions: &[Vec3]) -> Vec<SplatBucket> {
        let mut full: Vec<SplatBucket> = Vec::new();
        let mut partial: Vec<Option<SplatBucket>> = Vec::new();
        let mut open_cells: HashMap<u64, usize> = HashMap::new();

        for (row, &position) in positions.iter().enumerate().skip(1) {
            let cell = self.cell_of(position);
            let key = self.cell_key(cell);
            let slot = *open_cells.entry(key).or_insert_with(|| {
                partial.push(Some(SplatBucket {
                    center: self.cell_center(cell),
                    members: Vec::with_capacity(self.bucket_size),
                }));
                partial.len() - 1
            });

            let Some(bucket) = partial[slot].as_mut() else {
                continue;
            };
            bucket.members.push(row);

            if bucket.members.len() >= self.bucket_size {
                if let Some(bucket) = partial[slot].take() {
                    full.push(bucket);
                }
                open_cells.remove(&key);
            }
        }

        for mut bucket in partial.into_iter().flatten() {
            bucket.members.resize(self.bucket_size, SENTINEL_ROW);
            full.push(bucket);
        }

        full
    }
}
