//! Per-frame geometry reconstruction
//!
//! - [`sampler`]: depth lookups, unprojection and projection
//! - [`normal`]: weighted-gradient surface normals
//! - [`view`]: a frame paired with the camera pose it was captured from

pub mod normal;
pub mod sampler;
pub mod view;

pub use normal::{NormalEstimator, NormalEstimatorConfig, view_to_camera};
pub use sampler::{DepthSampler, to_world_space};
pub use view::FrameView;
