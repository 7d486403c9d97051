//! depthkit
//!
//! Reconstruct surfaces from per-pixel depth, bounce a laser ray off them, and
//! accumulate colored world-space point clouds.
//!
//! This crate re-exports the workspace members:
//!
//! - [`data`]: depth frames, intrinsics, camera images and point types
//! - [`kernel`]: sampling, normal estimation, the ray state machine and the point cloud
//! - [`capture`]: synthetic and recorded depth sources

pub use depthkit_capture as capture;
pub use depthkit_core as kernel;
pub use depthkit_data as data;

pub use depthkit_capture::{CapturedFrame, DepthSource, RecordedSource, SyntheticScene};
pub use depthkit_core::{DepthKernel, FireRequest, FrameInputs, FrameOutputs, KernelConfig};
pub use depthkit_data::{CameraIntrinsics, DepthFrame, YuvImage};
