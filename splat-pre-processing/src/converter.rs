/// Source point cloud to splat buffer conversion.
use crate::dds_writer::{ExportedTextures, export_attribute_textures};
use crate::error::IngestError;
use crate::laz::read_las_rows;
use crate::manifest::SplatManifest;
use crate::options::IngestOptions;
use crate::ply::{PlyHeader, VertexSchema};
use crate::spatial_layout::{SpatialBucketGenerator, SplatBucket};
use glam::Vec3;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use splat_buffer::{SplatBounds, SplatBuffer, SplatRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Row counts and extent gathered while ingesting one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Valid rows plus the sentinel row at index 0.
    pub stored_rows: usize,
    pub padded_count: usize,
    pub bucket_count: usize,
    /// Higher order colour coefficients present but not decoded.
    pub f_rest_count: usize,
    /// Rows dropped for NaN or infinite geometry.
    pub non_finite_rows: usize,
    pub bounds: SplatBounds,
}

#[derive(Debug)]
pub struct IngestResult {
    pub buffer: SplatBuffer,
    pub stats: IngestStats,
}

/// Progress bar styling shared by every conversion stage.
pub fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{bar:40.green/blue}] {pos}/{len} splats ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("▉▊▋▌▍▎▏ ")
}

/// Parse a binary PLY document into a bucketed splat buffer.
/// Rows whose alpha is not above `options.minimum_alpha` are dropped.
pub fn ingest_ply(
    bytes: &[u8],
    options: &IngestOptions,
    pb: &ProgressBar,
) -> Result<IngestResult, IngestError> {
    let header = PlyHeader::parse(bytes)?;
    let expected = header.vertex_data_end()?;
    if bytes.len() < expected {
        return Err(IngestError::TruncatedBody {
            expected,
            actual: bytes.len(),
        });
    }

    let schema = VertexSchema::resolve(&header);
    let f_rest_count = header.f_rest_count();
    if f_rest_count > 0 {
        tracing::info!(
            "Source carries {} higher order colour coefficients ({} per channel); only the base colour is kept",
            f_rest_count,
            f_rest_count / 3
        );
    }
    if !schema.has_scale {
        tracing::debug!("No scale fields; using default scale and identity rotation");
    }

    pb.set_length(header.vertex_count as u64);
    pb.set_position(0);
    pb.set_message("Reading rows");

    let body = &bytes[header.vertex_data_offset..expected];
    let mut rows = Vec::with_capacity(body.len() / header.row_stride.max(1) + 1);
    rows.push(SplatRecord::sentinel(Vec3::ZERO));

    if header.row_stride > 0 {
        for (row_idx, row) in body.chunks_exact(header.row_stride).enumerate() {
            if schema.alpha(row) > options.minimum_alpha {
                rows.push(schema.decode(row));
            }
            if row_idx % 10_000 == 0 {
                pb.set_position(row_idx as u64);
            }
        }
    }
    pb.finish_with_message("Rows read");

    let mut result = assemble_buffer(rows, header.vertex_count, options, pb)?;
    result.stats.f_rest_count = f_rest_count;
    Ok(result)
}

/// Read a LAS/LAZ file into a bucketed splat buffer.
pub fn ingest_las(
    path: &Path,
    options: &IngestOptions,
    pb: &ProgressBar,
) -> Result<IngestResult, IngestError> {
    let (rows, total_points) = read_las_rows(path, options, pb)?;
    assemble_buffer(rows, total_points, options, pb)
}

/// Bucket and encode a row list whose first entry is the sentinel.
/// Rows with non-finite geometry are dropped and counted.
pub fn assemble_buffer(
    mut rows: Vec<SplatRecord>,
    total_rows: usize,
    options: &IngestOptions,
    pb: &ProgressBar,
) -> Result<IngestResult, IngestError> {
    let decoded_rows = rows.len();
    rows.retain(SplatRecord::is_finite);
    let non_finite_rows = decoded_rows - rows.len();
    if non_finite_rows > 0 {
        tracing::warn!("Dropped {} rows with non-finite geometry", non_finite_rows);
    }

    let valid_rows = rows.len().saturating_sub(1);
    tracing::info!("Total valid splats: {} out of {}", valid_rows, total_rows);
    if valid_rows == 0 {
        return Err(IngestError::NoValidSplats);
    }

    let bounds = calculate_bounds(&rows[1..]);
    log_bounds(&bounds);

    let positions: Vec<Vec3> = rows.iter().map(|row| row.position).collect();
    let generator = SpatialBucketGenerator::new(bounds, options.block_size, options.bucket_size)?;
    let buckets = generator.compute_buckets(&positions);

    let buffer = encode_buckets(&rows, &buckets, options, pb);
    tracing::info!(
        "Encoded {} buckets ({} stored splats, {} tier)",
        buckets.len(),
        buffer.splat_count(),
        options.compression_level
    );

    let stats = IngestStats {
        total_rows,
        valid_rows,
        stored_rows: rows.len(),
        padded_count: buffer.splat_count(),
        bucket_count: buckets.len(),
        f_rest_count: 0,
        non_finite_rows,
        bounds,
    };

    Ok(IngestResult { buffer, stats })
}

/// Calculate bounds with chunked parallel reduction.
fn calculate_bounds(rows: &[SplatRecord]) -> SplatBounds {
    rows.par_chunks(25_000)
        .map(|chunk| {
            let mut local_bounds = SplatBounds::new();
            for row in chunk {
                local_bounds.update(row.position);
            }
            local_bounds
        })
        .reduce_with(|a, b| a.merge(&b))
        .unwrap_or_else(SplatBounds::new)
}

/// Write every bucket's members in order; padding slots keep the sentinel
/// the buffer was allocated with.
fn encode_buckets(
    rows: &[SplatRecord],
    buckets: &[SplatBucket],
    options: &IngestOptions,
    pb: &ProgressBar,
) -> SplatBuffer {
    let centers = buckets.iter().map(|bucket| bucket.center).collect();
    let mut buffer = SplatBuffer::bucketed(
        options.compression_level,
        centers,
        options.bucket_size,
        options.block_size,
    );

    pb.reset();
    pb.set_length(buffer.splat_count() as u64);
    pb.set_message("Encoding buckets");

    let mut out_index = 0;
    for bucket in buckets {
        for &row in &bucket.members {
            if row != crate::spatial_layout::SENTINEL_ROW {
                buffer.set_splat(out_index, &rows[row]);
            }
            out_index += 1;
        }
        pb.inc(bucket.members.len() as u64);
    }

    pb.finish_with_message("Buckets encoded");
    buffer
}

fn log_bounds(bounds: &SplatBounds) {
    tracing::info!("Splat bounds:");
    tracing::info!("  X: {:.2} to {:.2}", bounds.min.x, bounds.max.x);
    tracing::info!("  Y: {:.2} to {:.2}", bounds.min.y, bounds.max.y);
    tracing::info!("  Z: {:.2} to {:.2}", bounds.min.z, bounds.max.z);
}

/// Output of one file conversion.
#[derive(Debug)]
pub struct ConversionReport {
    pub buffer_path: PathBuf,
    pub manifest_path: PathBuf,
    pub textures: Option<ExportedTextures>,
    pub stats: IngestStats,
}

/// File level converter: picks the reader by extension, writes the
/// buffer, the manifest sidecar and optionally the attribute textures.
pub struct SplatConverter {
    input_path: PathBuf,
    output_path: PathBuf,
    options: IngestOptions,
    export_textures: bool,
}

impl SplatConverter {
    /// Output defaults to the input path with a `.splat` extension.
    pub fn new(input_path: &Path, output_path: Option<&Path>, options: IngestOptions) -> Self {
        let output_path = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input_path.with_extension("splat"));
        Self {
            input_path: input_path.to_path_buf(),
            output_path,
            options,
            export_textures: false,
        }
    }

    pub fn with_textures(mut self, export_textures: bool) -> Self {
        self.export_textures = export_textures;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn convert(&self) -> Result<ConversionReport, IngestError> {
        tracing::info!(
            "Converting {} to {} ({} tier)",
            self.input_path.display(),
            self.output_path.display(),
            self.options.compression_level
        );

        let pb = ProgressBar::new(0);
        pb.set_style(progress_style());

        let extension = self
            .input_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let IngestResult { mut buffer, stats } = match extension.as_str() {
            "ply" => ingest_ply(&fs::read(&self.input_path)?, &self.options, &pb)?,
            "las" | "laz" => ingest_las(&self.input_path, &self.options, &pb)?,
            other => {
                return Err(IngestError::UnsupportedFormat(format!(
                    "unrecognised input extension '{}'",
                    other
                )));
            }
        };

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        buffer.write_to_file(&self.output_path)?;
        tracing::info!("Saved {}", self.output_path.display());

        let textures = if self.export_textures {
            Some(export_attribute_textures(
                &mut buffer,
                &self.output_path.with_extension(""),
            )?)
        } else {
            None
        };

        let manifest_path = SplatManifest::path_for(&self.output_path);
        SplatManifest::new(
            &self.input_path,
            &self.output_path,
            &buffer,
            &stats,
            textures.as_ref(),
        )
        .write(&manifest_path)?;

        tracing::info!("Conversion complete!");
        Ok(ConversionReport {
            buffer_path: self.output_path.clone(),
            manifest_path,
            textures,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splat_buffer::CompressionLevel;

    fn ply_bytes(rows: &[[f32; 4]]) -> Vec<u8> {
        let mut bytes = format!(
            "ply\nformat binary_little_endian 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nproperty float opacity\nend_header\n",
            rows.len()
        )
        .into_bytes();
        for row in rows {
            for value in row {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn low_opacity_rows_are_dropped_and_buckets_padded() {
        // sigmoid(-10) * 255 is well below the default threshold of 1.
        let bytes = ply_bytes(&[
            [0.0, 0.0, 0.0, 2.0],
            [1.0, 0.0, 0.0, 2.0],
            [0.0, 1.0, 0.0, -10.0],
            [0.0, 0.0, 1.0, 2.0],
        ]);
        let result = ingest_ply(&bytes, &IngestOptions::default(), &ProgressBar::hidden()).unwrap();

        assert_eq!(result.stats.total_rows, 4);
        assert_eq!(result.stats.valid_rows, 3);
        assert_eq!(result.stats.stored_rows, 4);
        assert_eq!(result.stats.bucket_count, 1);
        assert_eq!(result.buffer.splat_count(), 256);

        let real = (0..256).filter(|&i| !result.buffer.is_sentinel(i)).count();
        assert_eq!(real, 3);
        assert!((3..256).all(|i| result.buffer.is_sentinel(i)));
        assert_eq!(result.buffer.get_position(1), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn threshold_is_a_parameter() {
        let bytes = ply_bytes(&[[0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 3.0]]);
        let options = IngestOptions {
            minimum_alpha: 200.0,
            ..IngestOptions::default()
        };
        let result = ingest_ply(&bytes, &options, &ProgressBar::hidden()).unwrap();
        assert_eq!(result.stats.valid_rows, 1);
    }

    #[test]
    fn all_rows_filtered_is_an_error() {
        let bytes = ply_bytes(&[[0.0, 0.0, 0.0, -20.0]]);
        let result = ingest_ply(&bytes, &IngestOptions::default(), &ProgressBar::hidden());
        assert!(matches!(result, Err(IngestError::NoValidSplats)));
    }

    #[test]
    fn short_body_is_truncated() {
        let mut bytes = ply_bytes(&[[0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]]);
        bytes.truncate(bytes.len() - 3);
        let result = ingest_ply(&bytes, &IngestOptions::default(), &ProgressBar::hidden());
        assert!(matches!(result, Err(IngestError::TruncatedBody { .. })));
    }

    #[test]
    fn quantized_ingest_keeps_members_near_their_bucket() {
        let rows: Vec<[f32; 4]> = (0..600)
            .map(|i| {
                let t = i as f32;
                [(t * 0.37) % 23.0, (t * 0.11) % 4.0, (t * 0.53) % 17.0, 3.0]
            })
            .collect();
        let options = IngestOptions {
            compression_level: CompressionLevel::Quantized,
            ..IngestOptions::default()
        };
        let result = ingest_ply(&ply_bytes(&rows), &options, &ProgressBar::hidden()).unwrap();
        let buffer = &result.buffer;
        let tolerance = buffer.header().position_decode_scale();

        assert_eq!(buffer.splat_count() % 256, 0);
        for index in 0..buffer.splat_count() {
            let bucket = buffer.bucket_of(index).unwrap();
            let center = buffer.bucket_center(bucket).unwrap();
            let offset = (buffer.get_position(index) - center).abs().max_element();
            assert!(offset <= 2.5 + tolerance);
        }
        let real = (0..buffer.splat_count()).filter(|&i| !buffer.is_sentinel(i)).count();
        assert_eq!(real, 600);
    }

    #[test]
    fn non_finite_rows_are_dropped_and_counted() {
        let bytes = ply_bytes(&[
            [0.0, 0.0, 0.0, 2.0],
            [f32::INFINITY, 0.0, 0.0, 2.0],
            [1.0, f32::NAN, 0.0, 2.0],
            [1.0, 1.0, 1.0, 2.0],
        ]);
        let result = ingest_ply(&bytes, &IngestOptions::default(), &ProgressBar::hidden()).unwrap();

        assert_eq!(result.stats.total_rows, 4);
        assert_eq!(result.stats.non_finite_rows, 2);
        assert_eq!(result.stats.valid_rows, 2);
        assert_eq!(result.stats.bounds.max, Vec3::ONE);
        assert!((0..result.buffer.splat_count()).all(|i| result.buffer.get_position(i).is_finite()));
    }

    #[test]
    fn only_non_finite_rows_is_no_valid_splats() {
        let bytes = ply_bytes(&[[f32::NEG_INFINITY, 0.0, 0.0, 2.0]]);
        let result = ingest_ply(&bytes, &IngestOptions::default(), &ProgressBar::hidden());
        assert!(matches!(result, Err(IngestError::NoValidSplats)));
    }

    #[test]
    fn oversized_vertex_count_is_rejected_before_reading() {
        let bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 4611686018427387904\nproperty float x\nend_header\n";
        let result = ingest_ply(bytes, &IngestOptions::default(), &ProgressBar::hidden());
        assert!(matches!(result, Err(IngestError::InvalidHeader(_))));
    }

    #[test]
    fn huge_extent_is_a_bucket_grid_error() {
        let bytes = ply_bytes(&[[-3.0e38, -3.0e38, -3.0e38, 2.0], [3.0e38, 3.0e38, 3.0e38, 2.0]]);
        let options = IngestOptions {
            block_size: 1.0e-3,
            ..IngestOptions::default()
        };
        let result = ingest_ply(&bytes, &options, &ProgressBar::hidden());
        assert!(matches!(result, Err(IngestError::BucketGrid(_))));
    }
}
