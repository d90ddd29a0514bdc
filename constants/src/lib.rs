/// Shared configuration for splat ingestion, storage and sorting.
pub mod coordinate_system;
pub mod format;
pub mod render_settings;
pub mod sorting;
