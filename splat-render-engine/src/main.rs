/// Headless splat viewer: loads a scene, orbits a camera and reports sort
/// statistics for each frame that dispatched a sort.
use clap::Parser;
use indicatif::ProgressBar;
use splat_pre_processing::IngestOptions;
use splat_render_engine::engine::loading::load_scene;
use splat_render_engine::{
    CameraState, DispatchOutcome, FrameOrchestrator, HeadlessTarget, OrbitCamera,
    SplatAttributeData, SplatRenderTarget, ViewerConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splat-viewer")]
#[command(about = "Drive the splat sort engine along a camera orbit")]
struct Cli {
    /// Scene to load: .splat, .ply, .las or .laz
    input: PathBuf,

    /// JSON viewer configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long, default_value_t = 240)]
    frames: u32,

    /// Yaw added per frame, in degrees
    #[arg(long, default_value_t = 1.5)]
    orbit_step: f32,

    /// Simulated frame interval in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Render surface width over height
    #[arg(long, default_value_t = 16.0 / 9.0)]
    aspect: f32,

    /// Minimum alpha (0-255) for rows ingested from raw point clouds
    #[arg(long)]
    min_alpha: Option<f32>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,splat_render_engine=info,splat_pre_processing=info,splat_buffer=info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };

    let defaults = IngestOptions::default();
    let options = IngestOptions {
        minimum_alpha: cli.min_alpha.unwrap_or(defaults.minimum_alpha),
        ..defaults
    };
    let pb = ProgressBar::new(0);
    let mut scene = load_scene(&cli.input, &options, &pb)?;

    let mut target = HeadlessTarget::default();
    let attributes = SplatAttributeData::from_buffer(&mut scene.buffer);
    target.upload_attributes(&attributes);

    let mut orchestrator = FrameOrchestrator::new(&scene.buffer, &config)?;
    orchestrator.wait_until_ready(&mut target, Duration::from_secs(30))?;

    let bounds = scene.buffer.bounds(|i| !scene.buffer.is_sentinel(i));
    let model = config.scene.model_matrix();
    let mut orbit = OrbitCamera::with_bounds(&bounds);
    orbit.focus_point = model.transform_point3(orbit.focus_point);
    let template = CameraState {
        aspect: cli.aspect,
        ..CameraState::default()
    };

    let step = cli.orbit_step.to_radians();
    let frame_interval = Duration::from_millis(cli.frame_ms);
    let mut dispatched = 0u32;
    for frame in 0..cli.frames {
        orbit.orbit(step, 0.0);
        let camera = orbit.camera_state(&template);
        let outcome = orchestrator.update(&camera, &mut target)?;
        if let DispatchOutcome::Dispatched {
            sort_count,
            render_count,
        } = outcome
        {
            dispatched += 1;
            let stats = orchestrator.statistics();
            println!(
                "frame {:4}: sorting {} of {} splats ({} of {} leaves visible), last sort {}",
                frame,
                sort_count,
                render_count,
                stats.visible_leaves,
                stats.total_leaves,
                stats
                    .last_sort_time
                    .map(|t| format!("{:.2} ms", t.as_secs_f64() * 1000.0))
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        std::thread::sleep(frame_interval);
    }

    orchestrator.wait_for_sort(&mut target, Duration::from_secs(10))?;
    let stats = orchestrator.statistics();
    println!(
        "{} frames, {} sorts dispatched ({} completed, {} canceled); {} splats in the last permutation",
        cli.frames, dispatched, stats.completed_sorts, stats.canceled_sorts, target.render_count
    );

    Ok(())
}
