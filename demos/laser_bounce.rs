//! Laser bounce example
//!
//! Fires a ray into the synthetic room, follows it for a few seconds and
//! prints every surface it bounced off, then reports the point cloud
//! gathered on the way.
//!
//! Usage:
//!   cargo run --example laser_bounce -- [seconds]

use depthkit::capture::SyntheticConfig;
use depthkit::{DepthKernel, DepthSource, FireRequest, FrameInputs, KernelConfig, SyntheticScene};
use std::error::Error;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let seconds: f32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 4.0,
    };

    let mut scene = SyntheticScene::new(SyntheticConfig {
        frame_count: Some((seconds * 30.0).ceil() as u64),
        ..SyntheticConfig::default()
    });
    let (width, height) = scene.resolution();
    let mut kernel = DepthKernel::new(KernelConfig::default());
    let dt = 1.0 / scene.frame_rate().unwrap_or(30.0);

    info!("Firing into a {}x{} synthetic room for {:.1}s", width, height, seconds);

    let mut frame_index = 0;
    let mut bounces_seen = 0;
    while let Some(frame) = scene.next_frame()? {
        let mut inputs = FrameInputs::new(&frame.depth, frame.camera_to_world);
        if let Some(image) = &frame.image {
            inputs = inputs.with_image(image);
        }
        if frame_index == 0 {
            inputs = inputs.with_fire(FireRequest::Center);
        }

        let outputs = kernel.step(dt, inputs);
        // Polyline is origin, bounces..., head.
        let bounces = outputs.ray_polyline.len().saturating_sub(2);
        if bounces > bounces_seen {
            let hit = outputs.ray_polyline[bounces];
            info!(
                "t={:.2}s bounce #{} at ({:.2}, {:.2}, {:.2})",
                frame.timestamp(),
                bounces,
                hit.x,
                hit.y,
                hit.z
            );
            bounces_seen = bounces;
        }
        frame_index += 1;
    }

    info!(
        "Ray ended {:?} after {} bounces; cloud holds {} points",
        kernel.ray().state(),
        bounces_seen,
        kernel.cloud().len()
    );
    Ok(())
}
