//! Depthkit Data Crate
//!
//! Frame-level data types for depth-driven geometry: depth grids with optional
//! confidence, pinhole intrinsics, YUV420 camera images and colored points.
//! This crate is engine-agnostic and performs no per-frame geometry work; see
//! `depthkit-core` for that.

pub mod frame;
pub mod intrinsics;
pub mod ply;
pub mod types;
pub mod yuv;

pub use frame::{DEPTH_MM_TO_M, DepthFrame, FrameError};
pub use intrinsics::CameraIntrinsics;
pub use ply::write_ascii_ply;
pub use types::{CloudPoint, CloudVertex, INVALID_VERTEX, is_valid_vertex};
pub use yuv::{YuvImage, rgb_to_yuv, yuv_to_rgb};
