/// JSON sidecar describing a converted splat buffer.
use crate::converter::IngestStats;
use crate::dds_writer::ExportedTextures;
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use splat_buffer::{CompressionLevel, SplatBounds, SplatBuffer};
use std::fs;
use std::path::{Path, PathBuf};

/// Sidecar manifest written next to every `.splat` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplatManifest {
    pub source: String,
    pub buffer: String,
    pub compression_level: CompressionLevel,
    /// Rows declared by the source.
    pub total_rows: usize,
    /// Rows that passed the alpha filter.
    pub valid_rows: usize,
    /// Stored splats including sentinel padding.
    pub padded_count: usize,
    pub bucket_count: usize,
    pub bucket_size: usize,
    pub bucket_block_size: f32,
    pub compression_scale_range: u32,
    pub bounds: SplatBounds,
    pub textures: Option<TextureFiles>,
}

/// Attribute textures exported alongside the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureFiles {
    /// RGBA32UI: packed colour plus position float bits.
    pub centers_colors: String,
    pub centers_colors_size: (u32, u32),
    /// RG16F: six covariance floats over three texels.
    pub covariances: String,
    pub covariances_size: (u32, u32),
}

impl From<&ExportedTextures> for TextureFiles {
    fn from(textures: &ExportedTextures) -> Self {
        Self {
            centers_colors: textures.centers_colors.display().to_string(),
            centers_colors_size: textures.centers_colors_size,
            covariances: textures.covariances.display().to_string(),
            covariances_size: textures.covariances_size,
        }
    }
}

impl SplatManifest {
    pub fn new(
        source: &Path,
        buffer_path: &Path,
        buffer: &SplatBuffer,
        stats: &IngestStats,
        textures: Option<&ExportedTextures>,
    ) -> Self {
        let header = buffer.header();
        Self {
            source: source.display().to_string(),
            buffer: buffer_path.display().to_string(),
            compression_level: header.compression_level,
            total_rows: stats.total_rows,
            valid_rows: stats.valid_rows,
            padded_count: header.splat_count,
            bucket_count: header.bucket_count,
            bucket_size: header.bucket_size,
            bucket_block_size: header.bucket_block_size,
            compression_scale_range: header.compression_scale_range,
            bounds: stats.bounds,
            textures: textures.map(TextureFiles::from),
        }
    }

    /// `<stem>.splat.json` next to the buffer.
    pub fn path_for(buffer_path: &Path) -> PathBuf {
        let mut name = buffer_path.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    }

    pub fn write(&self, path: &Path) -> Result<(), IngestError> {
        let manifest_json = serde_json::to_string_pretty(self)?;
        fs::write(path, manifest_json)?;
        tracing::info!("Generated manifest: {}", path.display());
        self.log_summary();
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, IngestError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Key statistics for verification and debugging.
    fn log_summary(&self) {
        tracing::info!("Manifest Summary:");
        tracing::info!(
            "  Splats: {} valid of {} rows, {} stored",
            self.valid_rows,
            self.total_rows,
            self.padded_count
        );
        tracing::info!(
            "  Buckets: {} x {} ({} tier)",
            self.bucket_count,
            self.bucket_size,
            self.compression_level
        );
        tracing::info!(
            "  Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
            self.bounds.min.x,
            self.bounds.min.y,
            self.bounds.min.z,
            self.bounds.max.x,
            self.bounds.max.y,
            self.bounds.max.z
        );
    }
}
