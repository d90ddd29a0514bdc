/// Fixed-size metadata block at the start of a persisted splat buffer
use crate::compression::CompressionLevel;
use crate::error::SplatBufferError;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use splat_constants::format::{
    BUCKET_BLOCK_SIZE, BUCKET_SIZE, BYTES_PER_BUCKET, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR,
    HEADER_SIZE_BYTES, QUANTIZED_SCALE_RANGE,
};

/// On-disk header fields (28 bytes, little-endian), followed by zero padding
/// up to `HEADER_SIZE_BYTES`.
///
/// Layout:
/// - version_major: u8            @ 0
/// - version_minor: u8            @ 1
/// - sh_degree: u8                @ 2   Reserved, always 0
/// - compression_level: u8        @ 3
/// - splat_count: u32             @ 4   Padded count
/// - bucket_size: u32             @ 8
/// - bucket_count: u32            @ 12
/// - bucket_block_size: f32       @ 16
/// - bytes_per_bucket: u32        @ 20
/// - compression_scale_range: u32 @ 24
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RawHeader {
    version_major: u8,
    version_minor: u8,
    sh_degree: u8,
    compression_level: u8,
    splat_count: u32,
    bucket_size: u32,
    bucket_count: u32,
    bucket_block_size: f32,
    bytes_per_bucket: u32,
    compression_scale_range: u32,
}

const _: () = assert!(std::mem::size_of::<RawHeader>() == 28);

/// Decoded header metadata shared by every accessor of a splat buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplatBufferHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub compression_level: CompressionLevel,
    /// Total stored splats, including sentinel padding.
    pub splat_count: usize,
    pub bucket_size: usize,
    pub bucket_count: usize,
    pub bucket_block_size: f32,
    pub compression_scale_range: u32,
}

impl SplatBufferHeader {
    /// Header for a buffer grouped into `bucket_count` full buckets.
    pub fn bucketed(
        compression_level: CompressionLevel,
        bucket_count: usize,
        bucket_size: usize,
        bucket_block_size: f32,
    ) -> Self {
        Self {
            version_major: FORMAT_VERSION_MAJOR,
            version_minor: FORMAT_VERSION_MINOR,
            compression_level,
            splat_count: bucket_count * bucket_size,
            bucket_size,
            bucket_count,
            bucket_block_size,
            compression_scale_range: compression_level.default_scale_range(),
        }
    }

    /// Header for a full precision buffer with no bucket grouping.
    pub fn unbucketed(splat_count: usize) -> Self {
        Self {
            version_major: FORMAT_VERSION_MAJOR,
            version_minor: FORMAT_VERSION_MINOR,
            compression_level: CompressionLevel::Full,
            splat_count,
            bucket_size: BUCKET_SIZE,
            bucket_count: 0,
            bucket_block_size: BUCKET_BLOCK_SIZE,
            compression_scale_range: CompressionLevel::Full.default_scale_range(),
        }
    }

    pub fn half_bucket_block_size(&self) -> f32 {
        self.bucket_block_size / 2.0
    }

    /// World units represented by one quantization step.
    pub fn position_decode_scale(&self) -> f32 {
        self.half_bucket_block_size() / self.compression_scale_range as f32
    }

    /// Quantization steps per world unit.
    pub fn position_encode_scale(&self) -> f32 {
        self.compression_scale_range as f32 / self.half_bucket_block_size()
    }

    /// True when positions are addressed relative to bucket centers.
    pub fn is_quantized(&self) -> bool {
        self.compression_level == CompressionLevel::Quantized
    }

    /// Size of the bucket center table that trails the attribute sections.
    pub fn bucket_table_size_bytes(&self) -> usize {
        if self.is_quantized() {
            self.bucket_count * BYTES_PER_BUCKET
        } else {
            0
        }
    }

    /// Size of everything after the header block.
    pub fn data_size_bytes(&self) -> usize {
        self.splat_count * self.compression_level.bytes_per_splat() + self.bucket_table_size_bytes()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let raw = RawHeader {
            version_major: self.version_major,
            version_minor: self.version_minor,
            sh_degree: 0,
            compression_level: self.compression_level.as_u8(),
            splat_count: self.splat_count as u32,
            bucket_size: self.bucket_size as u32,
            bucket_count: self.bucket_count as u32,
            bucket_block_size: self.bucket_block_size,
            bytes_per_bucket: if self.is_quantized() {
                BYTES_PER_BUCKET as u32
            } else {
                0
            },
            compression_scale_range: self.compression_scale_range,
        };

        let mut bytes = vec![0u8; HEADER_SIZE_BYTES];
        bytes[..std::mem::size_of::<RawHeader>()].copy_from_slice(bytemuck::bytes_of(&raw));
        bytes
    }

    /// Parse and validate the header block of a persisted buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SplatBufferError> {
        if bytes.len() < HEADER_SIZE_BYTES {
            return Err(SplatBufferError::Truncated {
                expected: HEADER_SIZE_BYTES,
                actual: bytes.len(),
            });
        }

        let raw: RawHeader =
            bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<RawHeader>()]);

        if raw.version_major != FORMAT_VERSION_MAJOR {
            return Err(SplatBufferError::UnsupportedVersion {
                major: raw.version_major,
                minor: raw.version_minor,
            });
        }

        let compression_level = CompressionLevel::from_u8(raw.compression_level)?;
        let compression_scale_range = if raw.compression_scale_range == 0 {
            compression_level.default_scale_range()
        } else {
            raw.compression_scale_range
        };

        let header = Self {
            version_major: raw.version_major,
            version_minor: raw.version_minor,
            compression_level,
            splat_count: raw.splat_count as usize,
            bucket_size: raw.bucket_size as usize,
            bucket_count: raw.bucket_count as usize,
            bucket_block_size: raw.bucket_block_size,
            compression_scale_range,
        };

        if header.is_quantized() {
            if header.bucket_size == 0 || header.bucket_count == 0 {
                return Err(SplatBufferError::InvalidHeader(
                    "quantized buffer without buckets".to_string(),
                ));
            }
            if header.bucket_count * header.bucket_size != header.splat_count {
                return Err(SplatBufferError::InvalidHeader(format!(
                    "{} buckets of {} do not cover {} splats",
                    header.bucket_count, header.bucket_size, header.splat_count
                )));
            }
            if raw.bytes_per_bucket as usize != BYTES_PER_BUCKET {
                return Err(SplatBufferError::InvalidHeader(format!(
                    "unexpected bucket entry size {}",
                    raw.bytes_per_bucket
                )));
            }
            if !(header.bucket_block_size.is_finite() && header.bucket_block_size > 0.0) {
                return Err(SplatBufferError::InvalidHeader(format!(
                    "invalid bucket block size {}",
                    header.bucket_block_size
                )));
            }
            // Encoded offsets span 0..=2 * range and must fit a u16.
            if header.compression_scale_range > QUANTIZED_SCALE_RANGE {
                return Err(SplatBufferError::InvalidHeader(format!(
                    "compression scale range {} exceeds {}",
                    header.compression_scale_range, QUANTIZED_SCALE_RANGE
                )));
            }
        }

        Ok(header)
    }
}
