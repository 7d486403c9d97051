//! Depthkit Core
//!
//! Depth-driven geometry for AR scenes: reconstruct surface points and
//! normals from a per-pixel depth map, bounce laser rays off the estimated
//! surface, and accumulate colored world-space point clouds.
//!
//! ## Modules
//!
//! - [`geometry`]: depth sampling, (un)projection and normal estimation
//! - [`ray`]: the laser ray state machine and reflection helpers
//! - [`cloud`]: ring-buffered point cloud accumulation
//! - [`kernel`]: a single per-frame entry point tying the above together
//!
//! Everything runs on the caller's thread, once per frame. Frame buffers are
//! only borrowed for the duration of a call.

pub mod cloud;
pub mod geometry;
pub mod kernel;
pub mod ray;

pub use cloud::{AccumulationPolicy, CloudConfig, PointCloudAccumulator, PointCloudBuffer};
pub use geometry::{DepthSampler, FrameView, NormalEstimator, NormalEstimatorConfig};
pub use kernel::{DepthKernel, FireRequest, FrameInputs, FrameOutputs, KernelConfig};
pub use ray::{RayBouncer, RayConfig, RayState};
