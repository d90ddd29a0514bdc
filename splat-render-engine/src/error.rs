use splat_buffer::SplatBufferError;
use splat_pre_processing::IngestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("unsupported scene file {0}")]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Buffer(#[from] SplatBufferError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[derive(Debug, Error)]
pub enum SortEngineError {
    #[error("sort worker is no longer running")]
    WorkerDisconnected,

    #[error("failed to spawn sort worker: {0}")]
    Spawn(std::io::Error),

    #[error("sort worker did not finish setup within {0:?}")]
    SetupTimeout(std::time::Duration),

    #[error("sort worker setup failed: {0}")]
    SetupFailed(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reasons a sort request is refused. Reported back as `SortCanceled`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SortRequestError {
    #[error("sort worker has not received positions")]
    NotReady,

    #[error("sort count {sort_count} exceeds render count {render_count}")]
    SortCountExceedsRenderCount {
        sort_count: usize,
        render_count: usize,
    },

    #[error("render count {render_count} exceeds {available} candidate indexes")]
    NotEnoughCandidates { render_count: usize, available: usize },

    #[error("output buffer holds {actual} entries, need {expected}")]
    OutputTooSmall { expected: usize, actual: usize },

    #[error("candidate index {index} out of range 0..{splat_count}")]
    IndexOutOfRange { index: u32, splat_count: usize },

    #[error("depth map range must be at least 2, got {0}")]
    InvalidDepthRange(usize),

    #[error("received {actual} position floats, expected {expected}")]
    PositionCountMismatch { expected: usize, actual: usize },
}
