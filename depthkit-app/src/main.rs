//! depthkit
//!
//! Headless driver for the depth kernel.
//!
//! Features:
//! - Synthetic or recorded depth sources
//! - Laser ray fired at a pixel or the screen center
//! - Point cloud accumulation with PLY export
//! - Depth preview and ray path export

mod app;
mod config;
mod errors;
mod export;

use app::{RunOptions, Session};
use clap::{Parser, ValueEnum};
use config::Overrides;
use depthkit_capture::{DepthSource, RecordedSource, SyntheticConfig, SyntheticScene};
use depthkit_core::{AccumulationPolicy, FireRequest};
use errors::AppError;
use glam::Vec2;
use std::path::PathBuf;
use tracing::info;

/// depthkit - bounce a laser off depth maps and build point clouds
#[derive(Parser, Debug)]
#[command(name = "depthkit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recording directory to replay (synthetic scene when omitted)
    #[arg(short, long)]
    recording: Option<PathBuf>,

    /// Maximum number of frames to process
    #[arg(short = 'n', long, default_value_t = 90)]
    frames: usize,

    /// JSON kernel config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fire the ray at a depth pixel "x,y" or at "center"
    #[arg(short, long, value_parser = parse_fire)]
    fire: Option<FireRequest>,

    /// Frame on which to fire
    #[arg(long, default_value_t = 0)]
    fire_at: usize,

    /// Frame on which to reset the ray
    #[arg(long)]
    reset_at: Option<usize>,

    /// Point cloud capacity
    #[arg(long)]
    capacity: Option<usize>,

    /// What happens to old points on each update
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Ray speed in meters per second
    #[arg(long)]
    velocity: Option<f32>,

    /// Sample every n-th depth pixel when accumulating
    #[arg(long)]
    stride: Option<u32>,

    /// Write the final point cloud as ASCII PLY
    #[arg(long)]
    export_ply: Option<PathBuf>,

    /// Write the last depth frame as a grayscale PNG
    #[arg(long)]
    depth_preview: Option<PathBuf>,

    /// Write the final ray path as JSON
    #[arg(long)]
    export_ray: Option<PathBuf>,

    /// Save processed frames as a recording
    #[arg(long)]
    record: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Persistent,
    Regenerate,
}

impl From<PolicyArg> for AccumulationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Persistent => Self::Persistent,
            PolicyArg::Regenerate => Self::RegenerateEachFrame,
        }
    }
}

fn parse_fire(value: &str) -> Result<FireRequest, String> {
    if value.eq_ignore_ascii_case("center") {
        return Ok(FireRequest::Center);
    }
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\" or \"center\", got {value:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid coordinate {s:?}: {e}"))
    };
    Ok(FireRequest::Touch(Vec2::new(parse(x)?, parse(y)?)))
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<(), AppError> {
    let config = config::load_config(
        args.config.as_deref(),
        Overrides {
            capacity: args.capacity,
            policy: args.policy.map(Into::into),
            velocity: args.velocity,
            stride: args.stride,
        },
    )?;

    let mut source: Box<dyn DepthSource> = match &args.recording {
        Some(dir) => Box::new(RecordedSource::open(dir)?),
        None => {
            info!("No recording given, using the synthetic scene");
            Box::new(SyntheticScene::new(SyntheticConfig::default()))
        }
    };

    let mut session = Session::new(
        config,
        RunOptions {
            max_frames: Some(args.frames),
            fire: args.fire,
            fire_at: args.fire_at,
            reset_at: args.reset_at,
            record: args.record.clone(),
        },
    );
    let summary = session.run(source.as_mut())?;

    if let Some(path) = &args.export_ply {
        export::export_cloud(path, session.kernel().cloud())?;
    }
    if let Some(path) = &args.depth_preview {
        let frame = summary
            .last_frame
            .as_ref()
            .ok_or(AppError::NothingToExport("source produced no frames"))?;
        export::export_depth_preview(path, &frame.depth)?;
    }
    if let Some(path) = &args.export_ray {
        export::export_ray(path, &session.kernel().ray().polyline())?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if let Err(e) = run(args) {
        eprintln!("depthkit error: {}", e);
        std::process::exit(1);
    }
}
