/// Splat conversion command line entry point
use clap::{Parser, Subcommand};
use splat_buffer::{CompressionLevel, SplatBuffer};
use splat_pre_processing::{IngestOptions, SplatConverter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splat-convert")]
#[command(about = "Convert point clouds into bucketed splat buffers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a .ply, .las or .laz file into a .splat buffer
    Convert {
        input: PathBuf,

        /// Output path (defaults to the input with a .splat extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression tier: full (0) or quantized (1)
        #[arg(short, long, default_value = "full")]
        compression: CompressionLevel,

        /// Rows with alpha (0-255) at or below this are dropped
        #[arg(long)]
        min_alpha: Option<f32>,

        /// Bucket cell edge length in world units
        #[arg(long)]
        block_size: Option<f32>,

        /// Splat size for point clouds without scale data
        #[arg(long)]
        point_size: Option<f32>,

        /// Also export GPU attribute textures as DDS
        #[arg(long)]
        textures: bool,
    },
    /// Print the header of a .splat buffer
    Info { input: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,splat_pre_processing=info,splat_buffer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            compression,
            min_alpha,
            block_size,
            point_size,
            textures,
        } => {
            let defaults = IngestOptions::default();
            let options = IngestOptions {
                compression_level: compression,
                minimum_alpha: min_alpha.unwrap_or(defaults.minimum_alpha),
                block_size: block_size.unwrap_or(defaults.block_size),
                point_size: point_size.unwrap_or(defaults.point_size),
                ..defaults
            };

            let converter =
                SplatConverter::new(&input, output.as_deref(), options).with_textures(textures);
            let report = converter.convert()?;

            println!(
                "{} -> {} ({} valid of {} rows, {} stored in {} buckets)",
                input.display(),
                report.buffer_path.display(),
                report.stats.valid_rows,
                report.stats.total_rows,
                report.stats.padded_count,
                report.stats.bucket_count
            );
        }
        Commands::Info { input } => {
            let buffer = SplatBuffer::read_from_file(&input)?;
            let header = buffer.header();
            let real = (0..buffer.splat_count())
                .filter(|&i| !buffer.is_sentinel(i))
                .count();
            let bounds = buffer.bounds(|i| !buffer.is_sentinel(i));

            println!("Splat buffer: {}", input.display());
            println!("  Version: {}.{}", header.version_major, header.version_minor);
            println!("  Compression: {}", header.compression_level);
            println!("  Splats: {} stored, {} non-padding", header.splat_count, real);
            println!(
                "  Buckets: {} x {} (block {:.2}, scale range {})",
                header.bucket_count,
                header.bucket_size,
                header.bucket_block_size,
                header.compression_scale_range
            );
            println!(
                "  Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
                bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
            );
        }
    }

    Ok(())
}
