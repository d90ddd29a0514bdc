use crate::error::SceneLoadError;
use indicatif::{ProgressBar, ProgressStyle};
use splat_buffer::SplatBuffer;
use splat_pre_processing::converter::progress_style;
use splat_pre_processing::{IngestOptions, IngestStats, ingest_las, ingest_ply};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const READ_CHUNK_BYTES: usize = 1 << 20;

/// A splat buffer ready for indexing, with its provenance.
#[derive(Debug)]
pub struct LoadedScene {
    pub source: PathBuf,
    pub buffer: SplatBuffer,
    /// Present when the scene was ingested from a raw point cloud.
    pub ingest_stats: Option<IngestStats>,
}

/// Read a whole file in chunks, advancing `pb` by bytes read.
pub fn read_with_progress(path: &Path, pb: &ProgressBar) -> Result<Vec<u8>, SceneLoadError> {
    let mut file = File::open(path)?;
    let length = file.metadata()?.len();
    pb.set_length(length);
    pb.set_position(0);

    let mut bytes = Vec::with_capacity(length as usize);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        pb.inc(read as u64);
    }
    Ok(bytes)
}

fn byte_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{bar:40.green/blue}] {bytes}/{total_bytes} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("▉▊▋▌▍▎▏ ")
}

/// Load a scene by extension. Raw sources are ingested with `options`.
pub fn load_scene(
    path: &Path,
    options: &IngestOptions,
    pb: &ProgressBar,
) -> Result<LoadedScene, SceneLoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let (buffer, ingest_stats) = match extension.as_str() {
        "splat" => {
            pb.set_style(byte_progress_style());
            pb.set_message(format!("Loading {}", path.display()));
            let bytes = read_with_progress(path, pb)?;
            (SplatBuffer::from_bytes(&bytes)?, None)
        }
        "ply" => {
            pb.set_style(byte_progress_style());
            pb.set_message(format!("Reading {}", path.display()));
            let bytes = read_with_progress(path, pb)?;
            pb.set_style(progress_style());
            let result = ingest_ply(&bytes, options, pb)?;
            (result.buffer, Some(result.stats))
        }
        "las" | "laz" => {
            pb.set_style(progress_style());
            let result = ingest_las(path, options, pb)?;
            (result.buffer, Some(result.stats))
        }
        _ => return Err(SceneLoadError::UnsupportedFormat(path.to_path_buf())),
    };
    pb.finish_with_message("Scene loaded");

    tracing::info!(
        "Loaded {} splats ({} compression) from {}",
        buffer.splat_count(),
        buffer.compression_level(),
        path.display()
    );

    Ok(LoadedScene {
        source: path.to_path_buf(),
        buffer,
        ingest_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        let result = load_scene(
            Path::new("scene.obj"),
            &IngestOptions::default(),
            &ProgressBar::hidden(),
        );
        assert!(matches!(result, Err(SceneLoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn persisted_buffers_load_directly() {
        let dir = std::env::temp_dir().join(format!("splat-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scene.splat");
        SplatBuffer::unbucketed(5).write_to_file(&path).unwrap();

        let scene = load_scene(&path, &IngestOptions::default(), &ProgressBar::hidden()).unwrap();
        assert_eq!(scene.buffer.splat_count(), 5);
        assert!(scene.ingest_stats.is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
