/// Failures surfaced by the ingestion pipeline
use splat_buffer::SplatBufferError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no end_header terminator within the first {0} bytes")]
    HeaderTerminatorNotFound(usize),

    #[error("invalid PLY header: {0}")]
    InvalidHeader(String),

    #[error("unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    #[error("vertex data truncated: expected {expected} bytes, found {actual}")]
    TruncatedBody { expected: usize, actual: usize },

    #[error("source contains no splats above the alpha threshold")]
    NoValidSplats,

    #[error("invalid ingest options: {0}")]
    InvalidOptions(String),

    #[error("bucket grid cannot be represented: {0}")]
    BucketGrid(String),

    #[error("LAS read failed: {0}")]
    Las(#[from] las::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DDS error: {0}")]
    Dds(#[from] ddsfile::Error),

    #[error(transparent)]
    Buffer(#[from] SplatBufferError),
}
