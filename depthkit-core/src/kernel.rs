//! Per-frame driver.
//!
//! The host calls [`DepthKernel::step`] once per rendered frame with the
//! latest sensor data and gets back the geometry to draw. Events (fire,
//! reset) are applied before the ray is advanced.

use crate::cloud::{CloudConfig, PointCloudAccumulator, PointCloudBuffer};
use crate::geometry::{FrameView, NormalEstimatorConfig};
use crate::ray::{RayBouncer, RayConfig, RayState};
use depthkit_data::{DepthFrame, YuvImage};
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// All kernel tunables.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub normals: NormalEstimatorConfig,
    pub ray: RayConfig,
    pub cloud: CloudConfig,
}

/// A request to shoot a new ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireRequest {
    /// Aim at the depth pixel under a touch.
    Touch(Vec2),
    /// Aim at the middle of the screen.
    Center,
}

impl FireRequest {
    fn target(self) -> Option<Vec2> {
        match self {
            Self::Touch(pixel) => Some(pixel),
            Self::Center => None,
        }
    }
}

/// Everything the kernel reads during one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub frame: &'a DepthFrame,
    pub camera_to_world: Mat4,
    pub image: Option<&'a YuvImage>,
    pub fire: Option<FireRequest>,
    pub reset: bool,
}

impl<'a> FrameInputs<'a> {
    pub fn new(frame: &'a DepthFrame, camera_to_world: Mat4) -> Self {
        Self {
            frame,
            camera_to_world,
            image: None,
            fire: None,
            reset: false,
        }
    }

    pub fn with_image(mut self, image: &'a YuvImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_fire(mut self, fire: FireRequest) -> Self {
        self.fire = Some(fire);
        self
    }

    pub fn with_reset(mut self) -> Self {
        self.reset = true;
        self
    }
}

/// Geometry produced by one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutputs {
    pub ray_state: RayState,
    pub ray_active: bool,
    pub ray_polyline: Vec<Vec3>,
    /// Valid points in the cloud buffer after this frame.
    pub cloud_count: usize,
    /// Points added this frame, `None` when accumulation was throttled.
    pub cloud_added: Option<usize>,
}

/// Owns the ray and the point cloud across frames.
#[derive(Debug, Clone)]
pub struct DepthKernel {
    bouncer: RayBouncer,
    accumulator: PointCloudAccumulator,
}

impl DepthKernel {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            bouncer: RayBouncer::new(config.ray, config.normals),
            accumulator: PointCloudAccumulator::new(config.cloud),
        }
    }

    pub fn ray(&self) -> &RayBouncer {
        &self.bouncer
    }

    pub fn cloud(&self) -> &PointCloudBuffer {
        self.accumulator.buffer()
    }

    pub fn is_ray_active(&self) -> bool {
        self.bouncer.is_active()
    }

    pub fn clear_cloud(&mut self) {
        self.accumulator.clear();
    }

    /// Advance everything by `dt` seconds.
    pub fn step(&mut self, dt: f32, inputs: FrameInputs<'_>) -> FrameOutputs {
        let view = FrameView::new(inputs.frame, inputs.camera_to_world);

        if inputs.reset {
            self.bouncer.reset();
        }
        if let Some(fire) = inputs.fire {
            self.bouncer.fire(fire.target(), &view);
        }
        let ray_state = self.bouncer.step(dt, &view);
        let cloud_added = self.accumulator.update(dt, &view, inputs.image);

        debug!(
            ?ray_state,
            cloud = self.accumulator.buffer().len(),
            "Kernel step at t={:.3}",
            inputs.frame.timestamp()
        );

        FrameOutputs {
            ray_state,
            ray_active: self.bouncer.is_active(),
            ray_polyline: self.bouncer.polyline(),
            cloud_count: self.accumulator.buffer().len(),
            cloud_added,
        }
    }
}

impl Default for DepthKernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}
