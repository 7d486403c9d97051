//! Common capture source types and traits.

use depthkit_data::{DepthFrame, FrameError, YuvImage};
use glam::Mat4;
use thiserror::Error;

/// Errors that can occur during capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Recording not found: {0}")]
    NotFound(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Manifest parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One sensor update: depth, the pose it was captured from, and optionally
/// the matching camera image.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub depth: DepthFrame,
    /// Camera-to-world transform (camera space: +x right, +y down, +z forward).
    pub camera_to_world: Mat4,
    pub image: Option<YuvImage>,
}

impl CapturedFrame {
    pub fn new(depth: DepthFrame, camera_to_world: Mat4) -> Self {
        Self {
            depth,
            camera_to_world,
            image: None,
        }
    }

    pub fn with_image(mut self, image: YuvImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn timestamp(&self) -> f64 {
        self.depth.timestamp()
    }
}

/// Trait for anything that produces posed depth frames.
pub trait DepthSource {
    /// Get the next frame. Returns `None` when the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;

    /// Depth resolution (width, height).
    fn resolution(&self) -> (u32, u32);

    /// Nominal frame rate, if known.
    fn frame_rate(&self) -> Option<f32>;

    /// Check if the source can still produce frames.
    fn is_active(&self) -> bool;
}
