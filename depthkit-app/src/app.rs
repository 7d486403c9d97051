//! Headless run loop: pull frames from a source and step the kernel.

use crate::errors::AppError;
use depthkit_capture::{CapturedFrame, DepthSource, RecordingWriter};
use depthkit_core::{DepthKernel, FireRequest, FrameInputs, KernelConfig, RayState};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Fallback time step when a source reports neither a rate nor timestamps.
const DEFAULT_FRAME_RATE: f32 = 30.0;

/// What to do during a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many frames even if the source has more.
    pub max_frames: Option<usize>,
    pub fire: Option<FireRequest>,
    /// Frame on which `fire` is applied.
    pub fire_at: usize,
    /// Frame on which the ray is reset, if any.
    pub reset_at: Option<usize>,
    /// Save every processed frame as a recording in this directory.
    pub record: Option<PathBuf>,
}

/// Result of a run.
#[derive(Debug)]
pub struct RunSummary {
    pub frames: usize,
    pub ray_state: RayState,
    /// Most vertices the ray polyline held at any point.
    pub longest_polyline: usize,
    pub cloud_updates: usize,
    pub last_frame: Option<CapturedFrame>,
}

/// Owns the kernel between frames.
pub struct Session {
    kernel: DepthKernel,
    options: RunOptions,
}

impl Session {
    pub fn new(config: KernelConfig, options: RunOptions) -> Self {
        Self {
            kernel: DepthKernel::new(config),
            options,
        }
    }

    pub fn kernel(&self) -> &DepthKernel {
        &self.kernel
    }

    /// Drive the kernel until the source runs dry or `max_frames` is reached.
    pub fn run(&mut self, source: &mut dyn DepthSource) -> Result<RunSummary, AppError> {
        let (width, height) = source.resolution();
        let nominal_dt = 1.0 / source.frame_rate().unwrap_or(DEFAULT_FRAME_RATE);
        info!(
            "Running kernel on {}x{} source (nominal dt {:.4}s)",
            width, height, nominal_dt
        );

        let mut writer = match &self.options.record {
            Some(dir) => {
                Some(RecordingWriter::create(dir)?.with_frame_rate(source.frame_rate()))
            }
            None => None,
        };

        let mut summary = RunSummary {
            frames: 0,
            ray_state: RayState::Inactive,
            longest_polyline: 0,
            cloud_updates: 0,
            last_frame: None,
        };
        let mut previous_timestamp: Option<f64> = None;
        let mut previous_state = RayState::Inactive;

        while self
            .options
            .max_frames
            .is_none_or(|max| summary.frames < max)
        {
            let Some(frame) = source.next_frame()? else {
                break;
            };
            let index = summary.frames;

            let dt = match previous_timestamp {
                Some(previous) if frame.timestamp() > previous => {
                    (frame.timestamp() - previous) as f32
                }
                _ => nominal_dt,
            };
            previous_timestamp = Some(frame.timestamp());

            let mut inputs = FrameInputs::new(&frame.depth, frame.camera_to_world);
            if let Some(image) = &frame.image {
                inputs = inputs.with_image(image);
            }
            if self.options.reset_at == Some(index) {
                inputs = inputs.with_reset();
            }
            if index == self.options.fire_at {
                if let Some(fire) = self.options.fire {
                    inputs = inputs.with_fire(fire);
                }
            }

            let outputs = self.kernel.step(dt, inputs);
            if outputs.ray_state != previous_state {
                info!(
                    "Frame {}: ray {:?} -> {:?}",
                    index, previous_state, outputs.ray_state
                );
                previous_state = outputs.ray_state;
            }
            if index == self.options.fire_at && self.options.fire.is_some() && !outputs.ray_active
            {
                warn!("Frame {}: fire target has no depth behind it", index);
            }
            debug!(
                "Frame {}: {} ray vertices, {} cloud points",
                index,
                outputs.ray_polyline.len(),
                outputs.cloud_count
            );

            summary.longest_polyline = summary.longest_polyline.max(outputs.ray_polyline.len());
            if outputs.cloud_added.is_some() {
                summary.cloud_updates += 1;
            }
            summary.ray_state = outputs.ray_state;
            summary.frames += 1;

            if let Some(writer) = writer.as_mut() {
                writer.write(&frame)?;
            }
            summary.last_frame = Some(frame);
        }

        if let Some(writer) = writer {
            if writer.is_empty() {
                warn!("No frames captured; recording not written");
            } else {
                writer.finish()?;
            }
        }

        info!(
            "Processed {} frames: ray {:?}, {} cloud points after {} updates",
            summary.frames,
            summary.ray_state,
            self.kernel.cloud().len(),
            summary.cloud_updates
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthkit_capture::{RecordedSource, SyntheticConfig, SyntheticScene};
    use tempfile::tempdir;

    fn scene(frames: u64) -> SyntheticScene {
        SyntheticScene::new(SyntheticConfig {
            depth_width: 40,
            depth_height: 30,
            color_size: None,
            frame_count: Some(frames),
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn test_run_fires_and_accumulates() {
        let mut session = Session::new(
            KernelConfig::default(),
            RunOptions {
                fire: Some(FireRequest::Center),
                ..RunOptions::default()
            },
        );
        let summary = session.run(&mut scene(12)).unwrap();

        assert_eq!(summary.frames, 12);
        assert_ne!(summary.ray_state, RayState::Inactive);
        assert!(summary.longest_polyline >= 2);
        assert!(summary.cloud_updates >= 1);
        assert!(!session.kernel().cloud().is_empty());
        assert!(summary.last_frame.is_some());
    }

    #[test]
    fn test_max_frames_and_reset() {
        let mut session = Session::new(
            KernelConfig::default(),
            RunOptions {
                max_frames: Some(5),
                fire: Some(FireRequest::Center),
                reset_at: Some(4),
                ..RunOptions::default()
            },
        );
        let summary = session.run(&mut scene(100)).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.ray_state, RayState::Inactive);
    }

    #[test]
    fn test_record_then_replay() {
        let dir = tempdir().unwrap();
        let mut session = Session::new(
            KernelConfig::default(),
            RunOptions {
                record: Some(dir.path().to_path_buf()),
                ..RunOptions::default()
            },
        );
        session.run(&mut scene(3)).unwrap();

        let mut replay = RecordedSource::open(dir.path()).unwrap();
        let summary = Session::new(KernelConfig::default(), RunOptions::default())
            .run(&mut replay)
            .unwrap();
        assert_eq!(summary.frames, 3);
    }
}
