use thiserror::Error;

/// Failures while loading or validating a persisted splat buffer.
/// A failed load never touches an already loaded buffer.
#[derive(Debug, Error)]
pub enum SplatBufferError {
    #[error("unsupported splat buffer version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("unsupported compression level {0}")]
    UnsupportedCompressionLevel(u8),
    #[error("splat buffer truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("invalid splat buffer header: {0}")]
    InvalidHeader(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
