//! Point cloud accumulation
//!
//! Every valid depth pixel becomes a world-space point colored from the
//! camera image. Points land in a fixed-capacity ring buffer, so the cloud
//! grows until full and then keeps the most recent points.

pub mod accumulator;
pub mod buffer;
pub mod throttle;

pub use accumulator::{AccumulationPolicy, CloudConfig, PointCloudAccumulator};
pub use buffer::PointCloudBuffer;
pub use throttle::{ThrottleConfig, UpdateThrottle};
