//! Depth-to-point-cloud accumulation with camera color fusion.

use crate::cloud::{PointCloudBuffer, ThrottleConfig, UpdateThrottle};
use crate::geometry::FrameView;
use depthkit_data::YuvImage;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happens to previously accumulated points on each update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationPolicy {
    /// Keep points across frames; the ring buffer recycles the oldest.
    #[default]
    Persistent,
    /// Clear the buffer before every accumulation.
    RegenerateEachFrame,
}

/// Accumulator tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Maximum number of points kept.
    pub capacity: usize,
    /// Pixels with a lower confidence are skipped (when confidence exists).
    pub min_confidence: u8,
    /// Sample every `stride`-th pixel along both axes.
    pub stride: u32,
    /// Color used when no camera image is supplied.
    pub default_color: [f32; 3],
    pub policy: AccumulationPolicy,
    pub throttle: ThrottleConfig,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            capacity: 200_000,
            min_confidence: 1,
            stride: 1,
            default_color: [1.0, 1.0, 1.0],
            policy: AccumulationPolicy::Persistent,
            throttle: ThrottleConfig::default(),
        }
    }
}

/// Maps depth pixels onto a center-cropped camera image.
///
/// The camera image is assumed to share the depth image's width; any extra
/// height is split evenly above and below.
#[derive(Debug, Clone, Copy)]
struct ColorMapping {
    scale_x: f32,
    scale_y: f32,
    offset_y: f32,
    max_x: u32,
    max_y: u32,
}

impl ColorMapping {
    fn new(depth_size: (u32, u32), camera_size: (u32, u32)) -> Self {
        let (depth_w, depth_h) = (depth_size.0 as f32, depth_size.1 as f32);
        let (cam_w, cam_h) = (camera_size.0 as f32, camera_size.1 as f32);

        let depth_aspect = depth_h / depth_w;
        let color_height_scaled = cam_w * depth_aspect;
        Self {
            scale_x: cam_w / depth_w,
            scale_y: color_height_scaled / depth_h,
            offset_y: (cam_h - color_height_scaled) / 2.0,
            max_x: camera_size.0 - 1,
            max_y: camera_size.1 - 1,
        }
    }

    fn map(&self, x: u32, y: u32) -> (u32, u32) {
        let color_x = x as f32 * self.scale_x;
        let color_y = self.offset_y + y as f32 * self.scale_y;
        (
            (color_x.max(0.0) as u32).min(self.max_x),
            (color_y.max(0.0) as u32).min(self.max_y),
        )
    }
}

/// Turns depth frames into world-space colored points.
#[derive(Debug, Clone)]
pub struct PointCloudAccumulator {
    config: CloudConfig,
    buffer: PointCloudBuffer,
    throttle: UpdateThrottle,
}

impl PointCloudAccumulator {
    pub fn new(config: CloudConfig) -> Self {
        Self {
            buffer: PointCloudBuffer::new(config.capacity),
            throttle: UpdateThrottle::new(config.throttle),
            config,
        }
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    pub fn buffer(&self) -> &PointCloudBuffer {
        &self.buffer
    }

    /// Drop all points; the next [`update`](Self::update) runs immediately.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.throttle.reset();
    }

    /// Throttled accumulation.
    ///
    /// Returns the number of points added, or `None` when the update was
    /// skipped because the interval has not elapsed.
    pub fn update(
        &mut self,
        dt: f32,
        view: &FrameView<'_>,
        image: Option<&YuvImage>,
    ) -> Option<usize> {
        if !self.throttle.tick(dt) {
            return None;
        }
        Some(self.accumulate(view, image))
    }

    /// Convert every valid pixel of the frame, ignoring the throttle.
    #[tracing::instrument(skip_all, fields(frame = ?view.sampler().frame().dimensions()))]
    pub fn accumulate(&mut self, view: &FrameView<'_>, image: Option<&YuvImage>) -> usize {
        if self.config.policy == AccumulationPolicy::RegenerateEachFrame {
            self.buffer.clear();
        }

        let sampler = view.sampler();
        let frame = sampler.frame();
        let (width, height) = frame.dimensions();
        let mapping = image.map(|image| ColorMapping::new((width, height), image.dimensions()));
        let default_color = Vec3::from(self.config.default_color);
        let stride = self.config.stride.max(1) as usize;

        let mut added = 0;
        for y in (0..height).step_by(stride) {
            for x in (0..width).step_by(stride) {
                let (xi, yi) = (x as i32, y as i32);
                let depth = sampler.depth_at(xi, yi);
                if depth == 0.0 {
                    continue;
                }
                let confident = sampler
                    .confidence_at(xi, yi)
                    .is_none_or(|confidence| confidence >= self.config.min_confidence.max(1));
                if !confident {
                    continue;
                }

                let position = view.to_world(sampler.unproject(x as f32, y as f32, depth));
                let color = match (image, &mapping) {
                    (Some(image), Some(mapping)) => {
                        let (cx, cy) = mapping.map(x, y);
                        image.rgb_at(cx, cy)
                    }
                    _ => default_color,
                };

                self.buffer.push(position, color);
                added += 1;
            }
        }

        debug!(
            "Accumulated {} points ({} / {} in buffer)",
            added,
            self.buffer.len(),
            self.buffer.capacity()
        );
        added
    }
}

impl Default for PointCloudAccumulator {
    fn default() -> Self {
        Self::new(CloudConfig::default())
    }
}
