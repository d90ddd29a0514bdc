/// Columnar splat store with on-the-fly decoding of quantized attributes
use crate::bounds::SplatBounds;
use crate::compression::CompressionLevel;
use crate::covariance::compute_covariance;
use crate::error::SplatBufferError;
use crate::header::SplatBufferHeader;
use crate::record::{SplatRecord, normalize_or_identity};
use glam::{Quat, Vec3};
use half::f16;
use rayon::prelude::*;
use splat_constants::format::{COVARIANCE_SIZE_FLOATS, HEADER_SIZE_BYTES};
use std::fs;
use std::path::Path;

const POSITION_COMPONENTS: usize = 3;
const SCALE_COMPONENTS: usize = 3;
const ROTATION_COMPONENTS: usize = 4;
const COLOR_COMPONENTS: usize = 4;

/// Position storage: raw floats, or bucket relative quantized offsets.
#[derive(Debug, Clone)]
enum PositionData {
    Full(Vec<f32>),
    Quantized(Vec<u16>),
}

/// Scale and rotation storage: raw floats or half floats.
#[derive(Debug, Clone)]
enum FloatData {
    Full(Vec<f32>),
    Half(Vec<f16>),
}

impl FloatData {
    fn zeroed(level: CompressionLevel, len: usize) -> Self {
        match level {
            CompressionLevel::Full => Self::Full(vec![0.0; len]),
            CompressionLevel::Quantized => Self::Half(vec![f16::ZERO; len]),
        }
    }

    #[inline]
    fn get(&self, index: usize) -> f32 {
        match self {
            Self::Full(values) => values[index],
            Self::Half(values) => values[index].to_f32(),
        }
    }

    #[inline]
    fn set(&mut self, index: usize, value: f32) {
        match self {
            Self::Full(values) => values[index] = value,
            Self::Half(values) => values[index] = f16::from_f32(value),
        }
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Self::Full(values) => {
                for value in values {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
            Self::Half(values) => {
                for value in values {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    fn read_bytes(level: CompressionLevel, bytes: &[u8]) -> Self {
        match level {
            CompressionLevel::Full => Self::Full(
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            CompressionLevel::Quantized => Self::Half(
                bytes
                    .chunks_exact(2)
                    .map(|b| f16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            ),
        }
    }
}

/// In-memory splat store: four parallel attribute arrays of equal logical
/// length plus, for bucketed buffers, the bucket center table.
///
/// Every accessor takes a splat index in `0..splat_count()`; anything else
/// is a programming error and panics.
#[derive(Debug, Clone)]
pub struct SplatBuffer {
    header: SplatBufferHeader,
    positions: PositionData,
    scales: FloatData,
    rotations: FloatData,
    colors: Vec<u8>,
    bucket_centers: Vec<Vec3>,
    covariances: Option<Vec<f32>>,
}

impl SplatBuffer {
    /// Allocate a bucketed buffer with every slot set to the sentinel splat.
    /// Splat `i` belongs to bucket `i / bucket_size`.
    pub fn bucketed(
        compression_level: CompressionLevel,
        bucket_centers: Vec<Vec3>,
        bucket_size: usize,
        bucket_block_size: f32,
    ) -> Self {
        assert!(bucket_size > 0, "bucket size must be non-zero");
        assert!(
            bucket_block_size.is_finite() && bucket_block_size > 0.0,
            "bucket block size must be positive, got {}",
            bucket_block_size
        );
        let header = SplatBufferHeader::bucketed(
            compression_level,
            bucket_centers.len(),
            bucket_size,
            bucket_block_size,
        );
        Self::allocate(header, bucket_centers)
    }

    /// Allocate a full precision buffer without bucket grouping.
    pub fn unbucketed(splat_count: usize) -> Self {
        Self::allocate(SplatBufferHeader::unbucketed(splat_count), Vec::new())
    }

    fn allocate(header: SplatBufferHeader, bucket_centers: Vec<Vec3>) -> Self {
        let count = header.splat_count;
        let level = header.compression_level;
        let positions = match level {
            CompressionLevel::Full => PositionData::Full(vec![0.0; count * POSITION_COMPONENTS]),
            CompressionLevel::Quantized => {
                PositionData::Quantized(vec![0; count * POSITION_COMPONENTS])
            }
        };

        let mut buffer = Self {
            header,
            positions,
            scales: FloatData::zeroed(level, count * SCALE_COMPONENTS),
            rotations: FloatData::zeroed(level, count * ROTATION_COMPONENTS),
            colors: vec![0; count * COLOR_COMPONENTS],
            bucket_centers,
            covariances: None,
        };

        for index in 0..count {
            let center = buffer.bucket_of(index).map_or(Vec3::ZERO, |b| buffer.bucket_centers[b]);
            buffer.set_splat(index, &SplatRecord::sentinel(center));
        }

        buffer
    }

    pub fn header(&self) -> &SplatBufferHeader {
        &self.header
    }

    pub fn splat_count(&self) -> usize {
        self.header.splat_count
    }

    pub fn compression_level(&self) -> CompressionLevel {
        self.header.compression_level
    }

    pub fn bucket_count(&self) -> usize {
        self.header.bucket_count
    }

    pub fn bucket_size(&self) -> usize {
        self.header.bucket_size
    }

    /// Bucket owning a splat, if the buffer is bucketed.
    pub fn bucket_of(&self, index: usize) -> Option<usize> {
        self.check_index(index);
        if self.header.bucket_count == 0 || self.header.bucket_size == 0 {
            None
        } else {
            Some(index / self.header.bucket_size)
        }
    }

    /// Quantization origin of a bucket. Full precision buffers loaded from
    /// disk carry no center table and return `None`.
    pub fn bucket_center(&self, bucket: usize) -> Option<Vec3> {
        self.bucket_centers.get(bucket).copied()
    }

    #[inline]
    fn check_index(&self, index: usize) {
        assert!(
            index < self.header.splat_count,
            "splat index {} out of range 0..{}",
            index,
            self.header.splat_count
        );
    }

    pub fn get_position(&self, index: usize) -> Vec3 {
        self.check_index(index);
        let base = index * POSITION_COMPONENTS;
        match &self.positions {
            PositionData::Full(values) => {
                Vec3::new(values[base], values[base + 1], values[base + 2])
            }
            PositionData::Quantized(values) => {
                let center = self.bucket_centers[index / self.header.bucket_size];
                let scale = self.header.position_decode_scale();
                let range = self.header.compression_scale_range as f32;
                Vec3::new(
                    (values[base] as f32 - range) * scale + center.x,
                    (values[base + 1] as f32 - range) * scale + center.y,
                    (values[base + 2] as f32 - range) * scale + center.z,
                )
            }
        }
    }

    /// Store a position; quantized buffers clamp it to the bucket's cube.
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        self.check_index(index);
        let base = index * POSITION_COMPONENTS;
        match &mut self.positions {
            PositionData::Full(values) => {
                values[base] = position.x;
                values[base + 1] = position.y;
                values[base + 2] = position.z;
            }
            PositionData::Quantized(values) => {
                let center = self.bucket_centers[index / self.header.bucket_size];
                let scale = self.header.position_encode_scale();
                let range = self.header.compression_scale_range as f32;
                let max = (u64::from(self.header.compression_scale_range) * 2 + 1)
                    .min(u64::from(u16::MAX)) as f32;
                let delta = position - center;
                for (axis, value) in delta.to_array().into_iter().enumerate() {
                    let encoded = ((value * scale).round() + range).clamp(0.0, max);
                    values[base + axis] = encoded as u16;
                }
            }
        }
    }

    pub fn get_scale(&self, index: usize) -> Vec3 {
        self.check_index(index);
        let base = index * SCALE_COMPONENTS;
        Vec3::new(
            self.scales.get(base),
            self.scales.get(base + 1),
            self.scales.get(base + 2),
        )
    }

    pub fn set_scale(&mut self, index: usize, scale: Vec3) {
        self.check_index(index);
        let base = index * SCALE_COMPONENTS;
        self.scales.set(base, scale.x);
        self.scales.set(base + 1, scale.y);
        self.scales.set(base + 2, scale.z);
        self.covariances = None;
    }

    /// Rotations are stored `w, x, y, z` and always returned normalized.
    pub fn get_rotation(&self, index: usize) -> Quat {
        self.check_index(index);
        let base = index * ROTATION_COMPONENTS;
        normalize_or_identity(Quat::from_xyzw(
            self.rotations.get(base + 1),
            self.rotations.get(base + 2),
            self.rotations.get(base + 3),
            self.rotations.get(base),
        ))
    }

    pub fn set_rotation(&mut self, index: usize, rotation: Quat) {
        self.check_index(index);
        let rotation = normalize_or_identity(rotation);
        let base = index * ROTATION_COMPONENTS;
        self.rotations.set(base, rotation.w);
        self.rotations.set(base + 1, rotation.x);
        self.rotations.set(base + 2, rotation.y);
        self.rotations.set(base + 3, rotation.z);
        self.covariances = None;
    }

    pub fn get_color(&self, index: usize) -> [u8; 4] {
        self.check_index(index);
        let base = index * COLOR_COMPONENTS;
        [
            self.colors[base],
            self.colors[base + 1],
            self.colors[base + 2],
            self.colors[base + 3],
        ]
    }

    pub fn set_color(&mut self, index: usize, color: [u8; 4]) {
        self.check_index(index);
        let base = index * COLOR_COMPONENTS;
        self.colors[base..base + COLOR_COMPONENTS].copy_from_slice(&color);
    }

    pub fn get_splat(&self, index: usize) -> SplatRecord {
        SplatRecord {
            position: self.get_position(index),
            scale: self.get_scale(index),
            rotation: self.get_rotation(index),
            color: self.get_color(index),
        }
    }

    pub fn set_splat(&mut self, index: usize, splat: &SplatRecord) {
        self.set_position(index, splat.position);
        self.set_scale(index, splat.scale);
        self.set_rotation(index, splat.rotation);
        self.set_color(index, splat.color);
    }

    /// True for bucket padding slots.
    pub fn is_sentinel(&self, index: usize) -> bool {
        self.get_color(index)[3] == 0 && self.get_scale(index) == Vec3::ZERO
    }

    /// Exchange the complete attribute sets of two splats.
    /// Quantized positions are re-encoded against their new bucket.
    pub fn swap_splats(&mut self, a: usize, b: usize) {
        if a == b {
            self.check_index(a);
            return;
        }
        let splat_a = self.get_splat(a);
        let splat_b = self.get_splat(b);
        self.set_splat(a, &splat_b);
        self.set_splat(b, &splat_a);
    }

    /// Decode every position into `out` (3 floats per splat).
    pub fn fill_position_array(&self, out: &mut [f32]) {
        let count = self.splat_count();
        assert!(
            out.len() >= count * POSITION_COMPONENTS,
            "position destination holds {} floats, need {}",
            out.len(),
            count * POSITION_COMPONENTS
        );
        match &self.positions {
            PositionData::Full(values) => out[..values.len()].copy_from_slice(values),
            PositionData::Quantized(_) => {
                for (index, chunk) in out
                    .chunks_exact_mut(POSITION_COMPONENTS)
                    .take(count)
                    .enumerate()
                {
                    chunk.copy_from_slice(&self.get_position(index).to_array());
                }
            }
        }
    }

    /// Decode every scale into `out` (3 floats per splat).
    pub fn fill_scale_array(&self, out: &mut [f32]) {
        let len = self.splat_count() * SCALE_COMPONENTS;
        assert!(out.len() >= len, "scale destination too small");
        for (i, value) in out[..len].iter_mut().enumerate() {
            *value = self.scales.get(i);
        }
    }

    /// Decode every rotation into `out` (4 floats per splat, `w, x, y, z`).
    pub fn fill_rotation_array(&self, out: &mut [f32]) {
        let len = self.splat_count() * ROTATION_COMPONENTS;
        assert!(out.len() >= len, "rotation destination too small");
        for (i, value) in out[..len].iter_mut().enumerate() {
            *value = self.rotations.get(i);
        }
    }

    /// Copy every color into `out` (4 bytes per splat).
    pub fn fill_color_array(&self, out: &mut [u8]) {
        assert!(out.len() >= self.colors.len(), "color destination too small");
        out[..self.colors.len()].copy_from_slice(&self.colors);
    }

    /// Copy the cached covariances into `out` (6 floats per splat).
    /// Returns false when the cache has not been built.
    pub fn fill_covariance_array(&self, out: &mut [f32]) -> bool {
        let Some(covariances) = &self.covariances else {
            return false;
        };
        assert!(out.len() >= covariances.len(), "covariance destination too small");
        out[..covariances.len()].copy_from_slice(covariances);
        true
    }

    /// Recompute the covariance of every splat from its scale and rotation.
    /// Must run after bulk loads; any later scale or rotation write clears it.
    pub fn build_covariance_cache(&mut self) {
        let count = self.splat_count();
        let mut covariances = vec![0.0f32; count * COVARIANCE_SIZE_FLOATS];
        covariances
            .par_chunks_mut(COVARIANCE_SIZE_FLOATS)
            .enumerate()
            .for_each(|(index, out)| {
                out.copy_from_slice(&compute_covariance(
                    self.get_scale(index),
                    self.get_rotation(index),
                ));
            });
        self.covariances = Some(covariances);
        tracing::debug!("Built covariance cache for {} splats", count);
    }

    pub fn covariances(&self) -> Option<&[f32]> {
        self.covariances.as_deref()
    }

    pub fn covariance(&self, index: usize) -> Option<[f32; COVARIANCE_SIZE_FLOATS]> {
        self.check_index(index);
        let covariances = self.covariances.as_ref()?;
        let base = index * COVARIANCE_SIZE_FLOATS;
        let mut out = [0.0; COVARIANCE_SIZE_FLOATS];
        out.copy_from_slice(&covariances[base..base + COVARIANCE_SIZE_FLOATS]);
        Some(out)
    }

    /// Bounds of the decoded positions of every splat accepted by `include`.
    pub fn bounds(&self, include: impl Fn(usize) -> bool) -> SplatBounds {
        let mut bounds = SplatBounds::new();
        for index in 0..self.splat_count() {
            if include(index) {
                bounds.update(self.get_position(index));
            }
        }
        bounds
    }

    /// Serialize into the persisted layout: header, positions, scales,
    /// colors, rotations, then the bucket center table when quantized.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE_BYTES + self.header.data_size_bytes());
        out.extend_from_slice(&self.header.to_bytes());

        match &self.positions {
            PositionData::Full(values) => {
                for value in values {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
            PositionData::Quantized(values) => {
                for value in values {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
        self.scales.write_bytes(&mut out);
        out.extend_from_slice(&self.colors);
        self.rotations.write_bytes(&mut out);

        if self.header.is_quantized() {
            for center in &self.bucket_centers {
                for component in center.to_array() {
                    out.extend_from_slice(&component.to_le_bytes());
                }
            }
        }

        out
    }

    /// Parse a persisted buffer. Header and length are validated before any
    /// attribute data is decoded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SplatBufferError> {
        let header = SplatBufferHeader::from_bytes(bytes)?;
        let expected = HEADER_SIZE_BYTES + header.data_size_bytes();
        if bytes.len() < expected {
            return Err(SplatBufferError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let count = header.splat_count;
        let level = header.compression_level;
        let (position_bytes, rest) =
            bytes[HEADER_SIZE_BYTES..].split_at(count * level.bytes_per_position());
        let (scale_bytes, rest) = rest.split_at(count * level.bytes_per_scale());
        let (color_bytes, rest) = rest.split_at(count * level.bytes_per_color());
        let (rotation_bytes, rest) = rest.split_at(count * level.bytes_per_rotation());
        let bucket_bytes = &rest[..header.bucket_table_size_bytes()];

        let positions = match level {
            CompressionLevel::Full => PositionData::Full(
                position_bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
            CompressionLevel::Quantized => PositionData::Quantized(
                position_bytes
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            ),
        };

        let bucket_centers = bucket_bytes
            .chunks_exact(12)
            .map(|b| {
                Vec3::new(
                    f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                    f32::from_le_bytes([b[4], b[5], b[6], b[7]]),
                    f32::from_le_bytes([b[8], b[9], b[10], b[11]]),
                )
            })
            .collect();

        Ok(Self {
            positions,
            scales: FloatData::read_bytes(level, scale_bytes),
            rotations: FloatData::read_bytes(level, rotation_bytes),
            colors: color_bytes.to_vec(),
            bucket_centers,
            covariances: None,
            header,
        })
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), SplatBufferError> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn read_from_file(path: &Path) -> Result<Self, SplatBufferError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_splat(rng: &mut StdRng, center: Vec3, half_block: f32) -> SplatRecord {
        let offset = Vec3::new(
            rng.gen_range(-half_block..half_block),
            rng.gen_range(-half_block..half_block),
            rng.gen_range(-half_block..half_block),
        );
        let rotation = Quat::from_xyzw(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.1..1.0),
        );
        SplatRecord::new(
            center + offset,
            Vec3::new(
                rng.gen_range(0.001..2.0),
                rng.gen_range(0.001..2.0),
                rng.gen_range(0.001..2.0),
            ),
            rotation,
            [
                rng.gen_range(0..=255),
                rng.gen_range(0..=255),
                rng.gen_range(0..=255),
                rng.gen_range(1..=255),
            ],
        )
    }

    fn assert_close(a: Vec3, b: Vec3, tolerance: f32) {
        assert!(
            (a - b).abs().max_element() <= tolerance,
            "{:?} vs {:?} exceeds {}",
            a,
            b,
            tolerance
        );
    }

    fn assert_same_rotation(a: Quat, b: Quat, tolerance: f32) {
        // q and -q encode the same rotation.
        assert!(a.dot(b).abs() >= 1.0 - tolerance, "{:?} vs {:?}", a, b);
    }

    #[test]
    fn fresh_bucketed_buffer_is_all_sentinels() {
        let buffer = SplatBuffer::bucketed(
            CompressionLevel::Quantized,
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-4.0, 0.0, 9.0)],
            256,
            5.0,
        );
        assert_eq!(buffer.splat_count(), 512);
        for index in 0..buffer.splat_count() {
            assert!(buffer.is_sentinel(index));
            assert!(buffer.get_splat(index).is_sentinel());
        }
        assert_close(buffer.get_position(300), Vec3::new(-4.0, 0.0, 9.0), 1e-4);
    }

    #[test]
    fn full_tier_round_trip_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut buffer = SplatBuffer::unbucketed(64);
        for index in 0..64 {
            let splat = random_splat(&mut rng, Vec3::ZERO, 100.0);
            buffer.set_splat(index, &splat);
            let decoded = buffer.get_splat(index);
            assert_eq!(decoded.position, splat.position);
            assert_eq!(decoded.scale, splat.scale);
            assert_eq!(decoded.color, splat.color);
            assert_same_rotation(decoded.rotation, splat.rotation, 1e-6);
        }
    }

    #[test]
    fn quantized_tier_round_trip_within_tolerance() {
        let mut rng = StdRng::seed_from_u64(42);
        let centers = vec![Vec3::new(10.0, -3.0, 2.5), Vec3::new(-100.0, 40.0, 7.0)];
        let mut buffer = SplatBuffer::bucketed(CompressionLevel::Quantized, centers.clone(), 16, 5.0);
        let step = buffer.header().position_decode_scale();

        for index in 0..buffer.splat_count() {
            let center = centers[index / 16];
            let splat = random_splat(&mut rng, center, 2.5);
            buffer.set_splat(index, &splat);
            let decoded = buffer.get_splat(index);

            assert_close(decoded.position, splat.position, step);
            assert!((decoded.position - center).abs().max_element() <= 2.5 + step);
            // Half floats keep 11 significant bits.
            assert!(((decoded.scale - splat.scale) / splat.scale).abs().max_element() < 1e-3);
            assert_same_rotation(decoded.rotation, splat.rotation, 1e-3);
            assert_eq!(decoded.color, splat.color);
        }
    }

    #[test]
    fn quantized_positions_clamp_to_bucket_cube() {
        let mut buffer =
            SplatBuffer::bucketed(CompressionLevel::Quantized, vec![Vec3::ZERO], 4, 5.0);
        buffer.set_position(0, Vec3::new(100.0, -100.0, 0.0));
        let decoded = buffer.get_position(0);
        assert!(decoded.x <= 2.5 + 1e-3 && decoded.x > 2.4);
        assert!((decoded.y + 2.5).abs() < 1e-3);
    }

    #[test]
    fn persisted_buffer_round_trips() {
        let mut rng = StdRng::seed_from_u64(3);
        for level in [CompressionLevel::Full, CompressionLevel::Quantized] {
            let mut buffer = SplatBuffer::bucketed(level, vec![Vec3::new(1.0, 1.0, 1.0)], 8, 5.0);
            for index in 0..5 {
                let splat = random_splat(&mut rng, Vec3::new(1.0, 1.0, 1.0), 2.5);
                buffer.set_splat(index, &splat);
            }

            let bytes = buffer.to_bytes();
            assert_eq!(bytes.len(), HEADER_SIZE_BYTES + buffer.header().data_size_bytes());

            let loaded = SplatBuffer::from_bytes(&bytes).unwrap();
            assert_eq!(loaded.header(), buffer.header());
            for index in 0..buffer.splat_count() {
                assert_eq!(loaded.get_splat(index), buffer.get_splat(index));
            }
            assert_eq!(loaded.to_bytes(), bytes);
        }
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let buffer = SplatBuffer::bucketed(CompressionLevel::Quantized, vec![Vec3::ZERO], 8, 5.0);
        let bytes = buffer.to_bytes();
        let result = SplatBuffer::from_bytes(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(SplatBufferError::Truncated { .. })));
    }

    #[test]
    fn persisted_scale_range_is_bounded_and_honoured() {
        let buffer = SplatBuffer::bucketed(CompressionLevel::Quantized, vec![Vec3::ZERO], 4, 5.0);
        let mut bytes = buffer.to_bytes();

        bytes[24..28].copy_from_slice(&40000u32.to_le_bytes());
        assert!(matches!(
            SplatBuffer::from_bytes(&bytes),
            Err(SplatBufferError::InvalidHeader(_))
        ));
        bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            SplatBuffer::from_bytes(&bytes),
            Err(SplatBufferError::InvalidHeader(_))
        ));

        bytes[24..28].copy_from_slice(&1024u32.to_le_bytes());
        let mut loaded = SplatBuffer::from_bytes(&bytes).unwrap();
        loaded.set_position(1, Vec3::new(2.0, 2.0, 2.0));
        assert_close(loaded.get_position(1), Vec3::new(2.0, 2.0, 2.0), 2.5 / 1024.0);
    }

    #[test]
    fn covariance_cache_is_invalidated_by_scale_and_rotation_writes() {
        let mut buffer = SplatBuffer::unbucketed(2);
        buffer.set_scale(1, Vec3::new(1.0, 2.0, 3.0));
        buffer.set_rotation(1, Quat::IDENTITY);
        buffer.build_covariance_cache();
        assert_eq!(buffer.covariance(1), Some([1.0, 0.0, 0.0, 4.0, 0.0, 9.0]));

        buffer.set_scale(1, Vec3::ONE);
        assert!(buffer.covariances().is_none());

        buffer.build_covariance_cache();
        buffer.set_rotation(0, Quat::from_rotation_y(0.3));
        assert!(buffer.covariance(0).is_none());

        buffer.set_color(0, [1, 2, 3, 4]);
        buffer.build_covariance_cache();
        buffer.set_color(1, [9, 9, 9, 9]);
        assert!(buffer.covariances().is_some());
    }

    #[test]
    fn swap_exchanges_full_attribute_sets() {
        let mut buffer = SplatBuffer::bucketed(
            CompressionLevel::Quantized,
            vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)],
            2,
            5.0,
        );
        let a = SplatRecord::new(Vec3::new(0.5, 0.5, 0.5), Vec3::ONE, Quat::IDENTITY, [1, 2, 3, 4]);
        let b = SplatRecord::new(
            Vec3::new(5.5, 0.0, 0.0),
            Vec3::splat(0.5),
            Quat::from_rotation_x(1.0),
            [5, 6, 7, 8],
        );
        buffer.set_splat(0, &a);
        buffer.set_splat(3, &b);
        buffer.swap_splats(0, 3);

        assert_eq!(buffer.get_color(0), [5, 6, 7, 8]);
        assert_eq!(buffer.get_color(3), [1, 2, 3, 4]);
        // Each position is re-encoded relative to its new bucket and clamped.
        assert_close(buffer.get_position(0), Vec3::new(2.5, 0.0, 0.0), 1e-3);
        assert_close(buffer.get_position(3), Vec3::new(2.5, 0.5, 0.5), 1e-3);
    }

    #[test]
    fn fill_arrays_match_accessors() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut buffer = SplatBuffer::bucketed(CompressionLevel::Quantized, vec![Vec3::ZERO], 4, 5.0);
        for index in 0..4 {
            buffer.set_splat(index, &random_splat(&mut rng, Vec3::ZERO, 2.5));
        }

        let mut positions = vec![0.0; 12];
        let mut colors = vec![0u8; 16];
        let mut rotations = vec![0.0; 16];
        buffer.fill_position_array(&mut positions);
        buffer.fill_color_array(&mut colors);
        buffer.fill_rotation_array(&mut rotations);

        for index in 0..4 {
            assert_eq!(&positions[index * 3..index * 3 + 3], &buffer.get_position(index).to_array());
            assert_eq!(&colors[index * 4..index * 4 + 4], &buffer.get_color(index));
        }
        let mut covariances = vec![0.0; 24];
        assert!(!buffer.fill_covariance_array(&mut covariances));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_fails_fast() {
        let buffer = SplatBuffer::unbucketed(3);
        buffer.get_position(3);
    }
}
