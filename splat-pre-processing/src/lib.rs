/// Conversion of external point clouds into bucketed splat buffers.
pub mod converter;
pub mod dds_writer;
pub mod error;
pub mod laz;
pub mod manifest;
pub mod options;
pub mod ply;
pub mod spatial_layout;

pub use converter::{
    ConversionReport, IngestResult, IngestStats, SplatConverter, assemble_buffer, ingest_las,
    ingest_ply,
};
pub use error::IngestError;
pub use manifest::SplatManifest;
pub use options::IngestOptions;
