//! Depth frames handed over by the capture subsystem.

use crate::intrinsics::CameraIntrinsics;
use thiserror::Error;

/// Raw depth samples are millimeters; the kernel works in meters.
pub const DEPTH_MM_TO_M: f32 = 0.001;

/// Errors raised when a frame is assembled from inconsistent buffers.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("Empty frame: {width}x{height}")]
    Empty { width: u32, height: u32 },

    #[error("{plane} buffer has {actual} samples, expected {expected}")]
    BufferSize {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Intrinsics describe a {intrinsics:?} image but the frame is {frame:?}")]
    IntrinsicsMismatch {
        intrinsics: (u32, u32),
        frame: (u32, u32),
    },

    #[error("Invalid stride: {0}")]
    InvalidStride(String),
}

/// An immutable snapshot of one depth sensor update.
///
/// Depth is stored in meters in row-major order (`depth[y * width + x]`),
/// `0.0` marks a missing sample. The optional confidence grid has the same
/// layout, `0` meaning no confidence at all.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    width: u32,
    height: u32,
    depth: Vec<f32>,
    confidence: Option<Vec<u8>>,
    intrinsics: CameraIntrinsics,
    timestamp: f64,
}

impl DepthFrame {
    /// Build a frame from depth samples already in meters.
    pub fn new(
        width: u32,
        height: u32,
        depth: Vec<f32>,
        intrinsics: CameraIntrinsics,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let expected = (width as usize) * (height as usize);
        if depth.len() != expected {
            return Err(FrameError::BufferSize {
                plane: "depth",
                expected,
                actual: depth.len(),
            });
        }
        if intrinsics.dimensions() != (width, height) {
            return Err(FrameError::IntrinsicsMismatch {
                intrinsics: intrinsics.dimensions(),
                frame: (width, height),
            });
        }

        Ok(Self {
            width,
            height,
            depth,
            confidence: None,
            intrinsics,
            timestamp: 0.0,
        })
    }

    /// Build a frame from fixed-point millimeter samples (`0` = invalid).
    pub fn from_millimeters(
        width: u32,
        height: u32,
        depth_mm: &[u16],
        intrinsics: CameraIntrinsics,
    ) -> Result<Self, FrameError> {
        let depth = depth_mm
            .iter()
            .map(|&mm| mm as f32 * DEPTH_MM_TO_M)
            .collect();
        Self::new(width, height, depth, intrinsics)
    }

    /// Attach a confidence grid of the same dimensions.
    pub fn with_confidence(mut self, confidence: Vec<u8>) -> Result<Self, FrameError> {
        if confidence.len() != self.depth.len() {
            return Err(FrameError::BufferSize {
                plane: "confidence",
                expected: self.depth.len(),
                actual: confidence.len(),
            });
        }
        self.confidence = Some(confidence);
        Ok(self)
    }

    /// Set the capture timestamp in seconds.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Depth samples in meters, row-major.
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn confidence(&self) -> Option<&[u8]> {
        self.confidence.as_deref()
    }

    /// Linear index of an in-range pixel.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the frame.
    pub fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} frame",
            self.width,
            self.height
        );
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Number of pixels carrying a nonzero depth sample.
    pub fn valid_count(&self) -> usize {
        self.depth.iter().filter(|&&d| d > 0.0).count()
    }
}
