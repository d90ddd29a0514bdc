/// LAS/LAZ point clouds as opaque isotropic splats
use crate::error::IngestError;
use crate::options::IngestOptions;
use glam::{Quat, Vec3};
use indicatif::ProgressBar;
use las::Reader;
use splat_buffer::SplatRecord;
use splat_constants::coordinate_system::transform_coordinates;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub fn create_reader(file_path: &Path) -> Result<Reader, IngestError> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

/// Read every point into a row list whose first entry is the sentinel.
/// Points become white when the file carries no RGB.
pub fn read_las_rows(
    file_path: &Path,
    options: &IngestOptions,
    pb: &ProgressBar,
) -> Result<(Vec<SplatRecord>, usize), IngestError> {
    let mut reader = create_reader(file_path)?;
    let total_points = reader.header().number_of_points() as usize;

    tracing::info!(
        "LAS {}.{} with {} points (format {})",
        reader.header().version().major,
        reader.header().version().minor,
        total_points,
        reader.header().point_format().to_u8().unwrap_or_default()
    );

    pb.set_length(total_points as u64);
    pb.set_position(0);
    pb.set_message("Reading points");

    let scale = Vec3::splat(options.point_size);
    let mut rows = Vec::with_capacity(total_points + 1);
    rows.push(SplatRecord::sentinel(Vec3::ZERO));

    for (idx, point_result) in reader.points().enumerate() {
        let point = point_result?;
        let (x, y, z) = transform_coordinates(point.x, point.y, point.z);
        let color = point.color.map_or([255, 255, 255, 255], |c| {
            [
                (c.red >> 8) as u8,
                (c.green >> 8) as u8,
                (c.blue >> 8) as u8,
                255,
            ]
        });

        rows.push(SplatRecord {
            position: Vec3::new(x as f32, y as f32, z as f32),
            scale,
            rotation: Quat::IDENTITY,
            color,
        });

        if idx % 50_000 == 0 {
            pb.set_position(idx as u64);
        }
    }

    pb.finish_with_message("Points loaded");
    Ok((rows, total_points))
}
